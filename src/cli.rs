use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::Shell;
use keyfob_hash::Algorithm;

#[derive(Parser)]
#[command(about, author, version, propagate_version = true)]
pub struct Opt {
    /// Directory that holds the token store. Defaults to the platform's data folder.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub store: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Option<Command>,
}

impl Opt {
    pub fn parse() -> Self {
        <Opt as Parser>::parse()
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a token from an `otpauth://` provisioning URI.
    Add {
        /// The full URI, including the secret.
        uri: String,
    },
    /// Add all tokens from a file, with one provisioning URI per line.
    ///
    /// Empty lines and lines starting with `#` are skipped.
    Import {
        /// The file to import.
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Verify the file content before importing, given as `<algorithm>:<hex digest>`.
        #[arg(short, long)]
        checksum: Option<String>,
    },
    /// List all tokens with their current code.
    ///
    /// Counter based tokens only show their counter, as showing the code would use it up.
    List,
    /// Print the code of a single token.
    Code {
        /// Position of the token, as shown by `list`.
        position: usize,
        /// Copy the code to the clipboard as well.
        #[arg(short, long)]
        copy: bool,
    },
    /// Show the codes of all time based tokens and keep them updated.
    Watch,
    /// Remove a token from the store.
    Remove {
        /// Position of the token, as shown by `list`.
        position: usize,
        /// Don't ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Move a token to another position.
    Move { from: usize, to: usize },
    /// Print all tokens as provisioning URIs.
    Export,
    /// Print the hex encoded digest of a text.
    Digest {
        /// One of MD5, SHA1, SHA224, SHA256, SHA384 or SHA512.
        algorithm: Algorithm,
        text: String,
    },
    /// Generate auto-completion scripts for various shells.
    Completions {
        /// Shell to generate an auto-completion script for.
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Generate man pages into the given directory.
    Manpages {
        /// Target directory, that must already exist and be empty. If the any file with the same
        /// name as any of the man pages already exist, it'll not be overwritten, but instead an
        /// error be returned.
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
    },
}

#[allow(clippy::unnecessary_wraps)]
pub fn completions(shell: Shell) -> Result<()> {
    clap_complete::generate(
        shell,
        &mut Opt::command(),
        env!("CARGO_PKG_NAME"),
        &mut io::stdout().lock(),
    );
    Ok(())
}

pub fn manpages(dir: &Path) -> Result<()> {
    fn print(dir: &Path, app: &clap::Command) -> Result<()> {
        let name = app.get_display_name().unwrap_or_else(|| app.get_name());
        let out = dir.join(format!("{name}.1"));
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&out)
            .with_context(|| format!("the file `{}` already exists", out.display()))?;

        clap_mangen::Man::new(app.clone()).render(&mut out)?;
        out.flush()?;

        for sub in app.get_subcommands() {
            print(dir, sub)?;
        }

        Ok(())
    }

    ensure!(dir.try_exists()?, "target directory doesn't exist");

    let mut app = Opt::command();
    app.build();

    print(dir, &app)
}
