//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Every version of a relation.
    History { relation_id: i64 },
    /// One version of a relation.
    Version { relation_id: i64, version: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub privileged: bool,
    pub json: bool,
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn parse(raw: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut positional = Vec::new();
        let mut privileged = false;
        let mut json = false;
        let mut config = None;

        let mut raw = raw.into_iter();
        while let Some(arg) = raw.next() {
            match arg.as_str() {
                "--privileged" => privileged = true,
                "--json" => json = true,
                "--config" => {
                    let path = raw.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                    config = Some(PathBuf::from(path));
                }
                flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
                _ => positional.push(arg.clone()),
            }
        }

        let command = match positional.as_slice() {
            [cmd, id] if cmd == "history" => Command::History {
                relation_id: id.parse().with_context(|| format!("bad relation id {:?}", id))?,
            },
            [cmd, id, version] if cmd == "version" => Command::Version {
                relation_id: id.parse().with_context(|| format!("bad relation id {:?}", id))?,
                version: version
                    .parse()
                    .with_context(|| format!("bad version {:?}", version))?,
            },
            _ => bail!(
                "usage: vellum history <relation-id> | vellum version <relation-id> <version> \
                 [--privileged] [--json] [--config <path>]"
            ),
        };

        Ok(Self {
            command,
            privileged,
            json,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_history_command() {
        let args = parse(&["history", "42", "--json"]).unwrap();
        assert_eq!(args.command, Command::History { relation_id: 42 });
        assert!(args.json);
        assert!(!args.privileged);
    }

    #[test]
    fn test_version_command_with_flags() {
        let args = parse(&["--privileged", "version", "42", "3", "--config", "v.toml"]).unwrap();
        assert_eq!(
            args.command,
            Command::Version {
                relation_id: 42,
                version: 3
            }
        );
        assert!(args.privileged);
        assert_eq!(args.config, Some(PathBuf::from("v.toml")));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["history", "abc"]).is_err());
        assert!(parse(&["version", "1"]).is_err());
        assert!(parse(&["history", "1", "--verbose"]).is_err());
        assert!(parse(&["history", "1", "--config"]).is_err());
    }
}
