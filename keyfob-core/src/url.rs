use std::fmt::Write;

use data_encoding::BASE32_NOPAD;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::{
    fingerprint, Algorithm, Digits, ExposeSecret, Key, Otp, Token, DEFAULT_PERIOD, MAX_KEY_LEN,
    MAX_LABEL_LEN,
};

/// Characters that would otherwise be read as separators or escapes when parsing.
const COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'=')
    .add(b'?');

/// Escape sequence that is never decoded, as it would end the string early in C based
/// implementations of the format.
const NUL: &str = "%00";

/// Any error that can happen when parsing a [`Token`] from a provisioning URI.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// An unknown scheme was used in the URI.
    #[error("the scheme `{0}` is not supported, only `otpauth`")]
    InvalidScheme(String),
    /// The OTP type after the scheme is not supported.
    #[error("OTP type is `{0}` but only `hotp` or `totp` are supported")]
    InvalidType(String),
    /// The URI ended before the OTP type.
    #[error("OTP type is missing")]
    MissingType,
    /// No secret was given or it decoded to zero bytes.
    #[error("the secret is missing")]
    MissingSecret,
    /// The secret is not valid Base32.
    #[error("the secret is not valid Base32")]
    Base32(#[from] data_encoding::DecodeError),
    /// The decoded secret is longer than supported.
    #[error("the secret is {0} bytes long but at most {MAX_KEY_LEN} are supported")]
    SecretTooLong(usize),
    /// A part of the URI was no proper UTF-8 after percent decoding.
    #[error("string is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

pub fn parse(value: &str) -> Result<Token, ParseError> {
    let mut pieces = value
        .split(['/', '?', '&', '='])
        .filter(|piece| !piece.is_empty());

    let scheme = decode(pieces.next().unwrap_or_default())?;
    if !scheme.eq_ignore_ascii_case("otpauth:") {
        return Err(ParseError::InvalidScheme(
            scheme.trim_end_matches(':').to_owned(),
        ));
    }

    let otp = decode(pieces.next().ok_or(ParseError::MissingType)?)?;
    let otp = if otp.eq_ignore_ascii_case("totp") {
        Otp::Totp
    } else if otp.eq_ignore_ascii_case("hotp") {
        Otp::Hotp { counter: 0 }
    } else {
        return Err(ParseError::InvalidType(otp));
    };

    let mut token = Token {
        issuer: String::new(),
        name: String::new(),
        secret: Key::new(Vec::new()),
        id: 0,
        digits: Digits::Six,
        algorithm: Algorithm::Sha1,
        period: DEFAULT_PERIOD,
        otp,
    };

    if let Some(label) = pieces.next() {
        let label = decode(label)?;
        token.id = fingerprint(&label);

        if let Some((issuer, name)) = label.split_once(':') {
            token.issuer = truncate(issuer);
            token.name = truncate(name);
        } else {
            token.name = truncate(&label);
        }
    }

    let mut counter = 0;

    while let (Some(key), Some(value)) = (pieces.next(), pieces.next()) {
        let key = decode(key)?;
        let value = decode(value)?;

        match key.as_str() {
            "secret" => token.secret = decode_secret(&value)?,
            "issuer" => {
                token.id = fingerprint(&format!("{value}:{}", token.name));
                token.issuer = truncate(&value);
            }
            "algorithm" => token.algorithm = value.parse().unwrap_or(Algorithm::Sha1),
            "digits" => {
                if value == "8" {
                    token.digits = Digits::Eight;
                }
            }
            "counter" => {
                let (negative, value) = leading_number(&value);
                counter = if negative { value.wrapping_neg() } else { value };
            }
            "period" => {
                let (negative, period) = leading_number(&value);
                if !negative && period != 0 {
                    token.period = period;
                }
            }
            _ => {}
        }
    }

    if let Otp::Hotp { counter: c } = &mut token.otp {
        *c = counter;
    }

    if token.secret.is_empty() {
        return Err(ParseError::MissingSecret);
    }

    Ok(token)
}

pub fn render(token: &Token) -> String {
    let (kind, counter) = match token.otp {
        Otp::Hotp { counter } => ("hotp", Some(counter)),
        Otp::Totp => ("totp", None),
    };

    let mut uri = format!("otpauth://{kind}/");
    // The label splits at the first colon, so such an issuer only travels in the parameter.
    if !token.issuer.is_empty() && !token.issuer.contains(':') {
        uri.extend(utf8_percent_encode(&token.issuer, COMPONENT));
        uri.push(':');
    }
    uri.extend(utf8_percent_encode(&token.name, COMPONENT));

    uri.push_str("?secret=");
    uri.push_str(&BASE32_NOPAD.encode(token.secret.expose_secret()));

    if !token.issuer.is_empty() {
        uri.push_str("&issuer=");
        uri.extend(utf8_percent_encode(&token.issuer, COMPONENT));
    }

    // Writing into a `String` can't fail.
    let _ = write!(
        uri,
        "&algorithm={}&digits={}&period={}",
        token.algorithm,
        token.digits,
        token.effective_period()
    );
    if let Some(counter) = counter {
        let _ = write!(uri, "&counter={counter}");
    }

    uri
}

/// Percent-decode a single piece of the URI, leaving any `%00` in place.
fn decode(piece: &str) -> Result<String, ParseError> {
    let mut out = Vec::with_capacity(piece.len());

    for (i, part) in piece.split(NUL).enumerate() {
        if i > 0 {
            out.extend_from_slice(NUL.as_bytes());
        }
        out.extend(percent_decode_str(part));
    }

    String::from_utf8(out).map_err(|e| e.utf8_error().into())
}

fn decode_secret(value: &str) -> Result<Key, ParseError> {
    let value = value.trim_end_matches('=').to_ascii_uppercase();
    let secret = BASE32_NOPAD.decode(value.as_bytes())?;

    if secret.len() > MAX_KEY_LEN {
        return Err(ParseError::SecretTooLong(secret.len()));
    }

    Ok(Key::new(secret))
}

fn truncate(value: &str) -> String {
    value.chars().take(MAX_LABEL_LEN).collect()
}

/// Read an optionally signed run of leading decimal digits, ignoring anything after them. Returns
/// whether the number was negative and its magnitude, which saturates at `u64::MAX`. Yields
/// `(false, 0)` if there are no digits.
fn leading_number(value: &str) -> (bool, u64) {
    let value = value.trim_start();
    let (negative, value) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let magnitude = value
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0_u64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(u64::from(digit - b'0'))
        });

    (negative && magnitude != 0, magnitude)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const EXAMPLE: &str =
        "otpauth://totp/Example:alice@example.com?secret=JBSWY3DPEHPK3PXP&issuer=Example";

    #[test]
    fn token_from_string() {
        let token = parse(EXAMPLE).unwrap();
        let expect = Token {
            issuer: "Example".to_owned(),
            name: "alice@example.com".to_owned(),
            secret: Key::new(b"Hello!\xde\xad\xbe\xef".to_vec()),
            id: fingerprint("Example:alice@example.com"),
            digits: Digits::Six,
            algorithm: Algorithm::Sha1,
            period: 30,
            otp: Otp::Totp,
        };

        assert_eq!(expect, token);
    }

    #[test]
    fn hotp_with_parameters() {
        let token = parse(
            "otpauth://HOTP/Service:bob?secret=gezdgnbvgy3tqojq&algorithm=sha512\
             &digits=8&counter=17&period=60",
        )
        .unwrap();

        assert_eq!(Otp::Hotp { counter: 17 }, token.otp);
        assert_eq!(Algorithm::Sha512, token.algorithm);
        assert_eq!(Digits::Eight, token.digits);
        assert_eq!(60, token.period);
        assert_eq!(b"1234567890".as_slice(), token.secret.expose_secret().as_slice());
    }

    #[test]
    fn scheme_must_be_otpauth() {
        assert!(matches!(
            parse("http://totp/a?secret=JBSWY3DPEHPK3PXP"),
            Err(ParseError::InvalidScheme(s)) if s == "http"
        ));
        assert!(matches!(parse(""), Err(ParseError::InvalidScheme(_))));
    }

    #[test]
    fn type_is_checked() {
        assert!(matches!(parse("otpauth://"), Err(ParseError::MissingType)));
        assert!(matches!(
            parse("otpauth://steam/a?secret=JBSWY3DPEHPK3PXP"),
            Err(ParseError::InvalidType(t)) if t == "steam"
        ));
    }

    #[test]
    fn secret_is_required() {
        assert!(matches!(
            parse("otpauth://totp/Example:alice?issuer=Example"),
            Err(ParseError::MissingSecret)
        ));
        assert!(matches!(
            parse("otpauth://totp/a?secret="),
            Err(ParseError::MissingSecret)
        ));
        assert!(matches!(
            parse("otpauth://totp/a?secret=!!!"),
            Err(ParseError::Base32(_))
        ));
    }

    #[test]
    fn secret_length_is_limited() {
        let long = BASE32_NOPAD.encode(&[7; 65]);
        assert!(matches!(
            parse(&format!("otpauth://totp/a?secret={long}")),
            Err(ParseError::SecretTooLong(65))
        ));

        let max = BASE32_NOPAD.encode(&[7; 64]);
        assert_eq!(64, parse(&format!("otpauth://totp/a?secret={max}")).unwrap().secret.len());
    }

    #[test]
    fn secret_padding_is_ignored() {
        let token = parse("otpauth://totp/a?secret=MFRGG===").unwrap();
        assert_eq!(b"abc".as_slice(), token.secret.expose_secret().as_slice());
    }

    #[test]
    fn percent_decoding_keeps_nul() {
        let token = parse("otpauth://totp/My%20Bank:a%00b?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!("My Bank", token.issuer);
        assert_eq!("a%00b", token.name);
        assert_eq!(fingerprint("My Bank:a%00b"), token.id);
    }

    #[test]
    fn encoded_separators_stay_in_label() {
        let token = parse("otpauth://totp/a%2Fb%3Dc%26d?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!("a/b=c&d", token.name);
    }

    #[test]
    fn invalid_utf8() {
        assert!(matches!(
            parse("otpauth://totp/%FF?secret=JBSWY3DPEHPK3PXP"),
            Err(ParseError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn issuer_parameter_changes_id() {
        let token = parse("otpauth://totp/alice?secret=JBSWY3DPEHPK3PXP&issuer=ACME").unwrap();
        assert_eq!("ACME", token.issuer);
        assert_eq!("alice", token.name);
        assert_eq!(fingerprint("ACME:alice"), token.id);

        let token = parse("otpauth://totp/alice?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!("", token.issuer);
        assert_eq!(fingerprint("alice"), token.id);
    }

    #[test]
    fn unknown_algorithm_falls_back() {
        let token = parse("otpauth://totp/a?secret=JBSWY3DPEHPK3PXP&algorithm=whirlpool").unwrap();
        assert_eq!(Algorithm::Sha1, token.algorithm);

        let token = parse("otpauth://totp/a?secret=JBSWY3DPEHPK3PXP&algorithm=md5").unwrap();
        assert_eq!(Algorithm::Md5, token.algorithm);
    }

    #[test]
    fn only_eight_digits_change_default() {
        for digits in ["7", "10", "08", "x"] {
            let token =
                parse(&format!("otpauth://totp/a?secret=JBSWY3DPEHPK3PXP&digits={digits}"))
                    .unwrap();
            assert_eq!(Digits::Six, token.digits, "{digits}");
        }
    }

    #[test]
    fn period_zero_keeps_default() {
        let token = parse("otpauth://totp/a?secret=JBSWY3DPEHPK3PXP&period=0").unwrap();
        assert_eq!(30, token.period);
        let token = parse("otpauth://totp/a?secret=JBSWY3DPEHPK3PXP&period=45s").unwrap();
        assert_eq!(45, token.period);
    }

    #[test]
    fn signed_numbers() {
        let token = parse("otpauth://hotp/a?secret=JBSWY3DPEHPK3PXP&counter=-1").unwrap();
        assert_eq!(Otp::Hotp { counter: u64::MAX }, token.otp);
        let token = parse("otpauth://hotp/a?secret=JBSWY3DPEHPK3PXP&counter=+7").unwrap();
        assert_eq!(Otp::Hotp { counter: 7 }, token.otp);
        let token = parse("otpauth://hotp/a?secret=JBSWY3DPEHPK3PXP&counter=-").unwrap();
        assert_eq!(Otp::Hotp { counter: 0 }, token.otp);

        let token = parse("otpauth://totp/a?secret=JBSWY3DPEHPK3PXP&period=-60").unwrap();
        assert_eq!(30, token.period);
    }

    #[test]
    fn huge_numbers_saturate() {
        let token =
            parse("otpauth://totp/a?secret=JBSWY3DPEHPK3PXP&period=18446744073709551615").unwrap();
        assert_eq!(u64::MAX, token.period);
        let token =
            parse("otpauth://totp/a?secret=JBSWY3DPEHPK3PXP&period=99999999999999999999").unwrap();
        assert_eq!(u64::MAX, token.period);
    }

    #[test]
    fn keys_are_case_sensitive_and_unknown_ignored() {
        assert!(matches!(
            parse("otpauth://totp/a?SECRET=JBSWY3DPEHPK3PXP"),
            Err(ParseError::MissingSecret)
        ));
        let token = parse("otpauth://totp/a?image=x&&secret=JBSWY3DPEHPK3PXP&dangling").unwrap();
        assert_eq!("a", token.name);
    }

    #[test]
    fn long_labels_are_truncated() {
        let name = "n".repeat(80);
        let token = parse(&format!("otpauth://totp/{name}?secret=JBSWY3DPEHPK3PXP")).unwrap();
        assert_eq!(MAX_LABEL_LEN, token.name.len());
        assert_eq!(fingerprint(&name), token.id);
    }

    #[test]
    fn uri_roundtrip() {
        let tokens = [
            EXAMPLE,
            "otpauth://hotp/Bank%20of%20Foo:me?secret=GEZDGNBVGY3TQOJQ&counter=5&digits=8\
             &algorithm=SHA224",
            "otpauth://totp/solo?secret=JBSWY3DPEHPK3PXP&period=90",
            "otpauth://totp/alice?secret=JBSWY3DPEHPK3PXP&issuer=A:B",
        ];

        for uri in tokens {
            let token = parse(uri).unwrap();
            assert_eq!(token, parse(&render(&token)).unwrap(), "{uri}");
        }
    }

    #[test]
    fn render_format() {
        let token = parse(EXAMPLE).unwrap();
        assert_eq!(
            "otpauth://totp/Example:alice@example.com?secret=JBSWY3DPEHPK3PXP&issuer=Example\
             &algorithm=SHA1&digits=6&period=30",
            render(&token)
        );
    }
}
