#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(
    clippy::too_many_lines,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use anyhow::{ensure, Context, Result};
use arboard::Clipboard;
use keyfob_core::{ExposeSecret, Otp, Token};
use keyfob_hash::Algorithm;
use keyfob_store::{FileBackend, TokenStore};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, Opt};

mod cli;
mod terminal;
mod watch;
mod widgets;

fn main() -> Result<()> {
    let opt = Opt::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("KEYFOB_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let store = opt.store;

    match opt.cmd.unwrap_or(Command::Watch) {
        Command::Add { uri } => add(&mut open(store)?, &uri),
        Command::Import { file, checksum } => {
            import(&mut open(store)?, &file, checksum.as_deref())
        }
        Command::List => list(&open(store)?),
        Command::Code { position, copy } => code(&mut open(store)?, position, copy),
        Command::Watch => watch::run(&mut open(store)?),
        Command::Remove { position, yes } => remove(&mut open(store)?, position, yes),
        Command::Move { from, to } => open(store)?.move_token(from, to).map_err(Into::into),
        Command::Export => export(&open(store)?),
        Command::Digest { algorithm, text } => {
            digest(algorithm, &text);
            Ok(())
        }
        Command::Completions { shell } => cli::completions(shell),
        Command::Manpages { dir } => cli::manpages(&dir),
    }
}

fn open(dir: Option<PathBuf>) -> Result<TokenStore<FileBackend>> {
    let dir = match dir {
        Some(dir) => dir,
        None => FileBackend::default_dir()?,
    };
    let backend = FileBackend::open(&dir)
        .with_context(|| format!("failed opening the store at `{}`", dir.display()))?;

    Ok(TokenStore::new(backend))
}

fn add(store: &mut TokenStore<FileBackend>, uri: &str) -> Result<()> {
    let token = uri
        .parse::<Token>()
        .context("invalid provisioning URI")?;

    ensure!(!store.exists(&token), "the token `{token}` already exists");
    store.add(&token)?;

    println!("Added {token}");
    Ok(())
}

fn import(
    store: &mut TokenStore<FileBackend>,
    file: &Path,
    checksum: Option<&str>,
) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("failed reading `{}`", file.display()))?;

    if let Some(checksum) = checksum {
        ensure!(
            keyfob_hash::verify(checksum, &data)?,
            "the file content doesn't match the checksum"
        );
    }

    let content = std::str::from_utf8(&data).context("the file is not valid UTF-8")?;
    let mut added = 0;

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let token = match line.parse::<Token>() {
            Ok(token) => token,
            Err(e) => {
                println!("line {}: {e}", index + 1);
                continue;
            }
        };

        if store.exists(&token) {
            println!("line {}: {token} already exists, skipped", index + 1);
            continue;
        }

        match store.add(&token) {
            Ok(()) => added += 1,
            Err(e) => println!("line {}: {e}", index + 1),
        }
    }

    println!("Imported {added} tokens");
    Ok(())
}

fn list(store: &TokenStore<FileBackend>) -> Result<()> {
    let now = UNIX_EPOCH.elapsed()?.as_secs();

    if store.count() == 0 {
        println!("No tokens yet, add one with `keyfob add <URI>`.");
        return Ok(());
    }

    for (position, token) in store.iter() {
        let token = match token {
            Ok(token) => token,
            Err(e) => {
                println!("{position:>3}  <unreadable: {e}>");
                continue;
            }
        };

        let value = match token.otp {
            Otp::Hotp { counter } => format!("counter {counter}"),
            Otp::Totp => {
                let codes = keyfob_gen::totp(
                    token.secret.expose_secret(),
                    token.algorithm,
                    token.period,
                    token.digits,
                    now,
                );
                format!(
                    "{}  ({}s)",
                    codes.current.code,
                    codes.current.window.remaining(now)
                )
            }
        };

        let label = token.to_string();
        println!("{position:>3}  {label:<40}  {value}");
    }

    Ok(())
}

fn code(store: &mut TokenStore<FileBackend>, position: usize, copy: bool) -> Result<()> {
    let mut token = store.get(position)?;
    let codes = keyfob_gen::generate(&mut token, store)?;
    let code = codes.current.code.to_string();

    println!("{token}");
    println!("{code}");

    if copy {
        Clipboard::new()?.set_text(code)?;
        println!("Copied to the clipboard");
    }

    Ok(())
}

fn remove(store: &mut TokenStore<FileBackend>, position: usize, yes: bool) -> Result<()> {
    let token = store.get(position)?;

    if !yes {
        let resp = rprompt::prompt_reply(&format!("Remove {token}? [yN] "))?;

        if !matches!(resp.as_str(), "y" | "Y") {
            println!("Removal cancelled");
            return Ok(());
        }
    }

    store.del(&token)?;
    println!("Removed {token}");

    Ok(())
}

fn export(store: &TokenStore<FileBackend>) -> Result<()> {
    for (position, token) in store.iter() {
        let token = token.with_context(|| format!("failed loading token {position}"))?;
        println!("{}", token.to_uri());
    }

    Ok(())
}

fn digest(algorithm: Algorithm, text: &str) {
    println!("{}", algorithm.digest(text.as_bytes()));
}
