use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use gcedevices::DeviceRecord;

pub const DEFAULT_CHANNEL: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print `address:port` of the first device matching the optional name.
    Find(Option<String>),
    /// Print every device answering discovery.
    List,
    Status,
    Donnees,
    /// Teleinfo and counters of one device.
    Report { channel: u8 },
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub command: Command,
    pub device: Option<DeviceRecord>,
    pub duration: Option<Duration>,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let mut positionals: Vec<String> = Vec::new();
        let mut device = None;
        let mut duration = None;
        let mut channel = None;
        let mut help = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--device" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--device requires ADDRESS:PORT"))?;
                    device = Some(
                        value
                            .parse::<DeviceRecord>()
                            .with_context(|| format!("Invalid value for --device: {value}"))?,
                    );
                }
                "--duration" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--duration requires a number of seconds"))?;
                    duration = Some(parse_duration(&value)?);
                }
                "--channel" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--channel requires 1 or 2"))?;
                    channel = Some(
                        value
                            .parse::<u8>()
                            .with_context(|| format!("Invalid value for --channel: {value}"))?,
                    );
                }
                "--help" | "-h" => help = true,
                other if other.starts_with("--") => {
                    bail!("Unknown option: {other}. Use --help for usage.")
                }
                other => positionals.push(other.to_string()),
            }
        }

        let mut positionals = positionals.into_iter();
        let command = match positionals.next().as_deref() {
            _ if help => Command::Help,
            Some("find") => Command::Find(positionals.next()),
            Some("list") => Command::List,
            Some("status") => Command::Status,
            Some("donnees") => Command::Donnees,
            None | Some("report") | Some("test") => Command::Report {
                channel: channel.unwrap_or(DEFAULT_CHANNEL),
            },
            Some(other) => bail!("Unknown command: {other}. Use --help for usage."),
        };

        if let Some(extra) = positionals.next().filter(|_| !help) {
            bail!("Unexpected argument: {extra}");
        }

        Ok(Self {
            command,
            device,
            duration,
        })
    }
}

fn parse_duration(value: &str) -> Result<Duration> {
    let secs: f64 = value
        .parse()
        .with_context(|| format!("Invalid value for --duration: {value}"))?;
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("Invalid value for --duration: {value}"))
}

pub fn print_usage() {
    println!(
        "Usage: gce [COMMAND] [OPTIONS]\n\
         \n\
         Commands:\n\
         \x20 find [NAME]   print ADDRESS:PORT of the first device (named NAME, or * for any)\n\
         \x20 list          print every device answering discovery\n\
         \x20 status        print status.xml values\n\
         \x20 donnees       print the xdevices.json summary\n\
         \x20 report        print teleinfo and counters (default)\n\
         \n\
         Options:\n\
         \x20 --device ADDRESS:PORT   skip discovery and query this device\n\
         \x20 --duration SECONDS      discovery time budget\n\
         \x20 --channel 1|2           teleinfo channel for report\n\
         \x20 -h, --help              show this help\n\
         \n\
         Environment:\n\
         \x20 RUST_LOG                log filter (logs go to stderr)\n\
         \x20 GCE_CONFIG              configuration directory (default .gce or ~/.gce)\n\
         \x20 GCE_CONFIG__HOST__...   override one configuration value"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn no_arguments_runs_the_report() {
        let options = parse(&[]).unwrap();
        assert_eq!(options.command, Command::Report { channel: 1 });
        assert_eq!(options.device, None);
        assert_eq!(options.duration, None);
    }

    #[test]
    fn find_takes_an_optional_name() {
        assert_eq!(parse(&["find"]).unwrap().command, Command::Find(None));
        assert_eq!(
            parse(&["find", "ECO-DEVICES"]).unwrap().command,
            Command::Find(Some("ECO-DEVICES".to_string()))
        );
        assert!(parse(&["find", "a", "b"]).is_err());
    }

    #[test]
    fn options_are_accepted_anywhere() {
        let options = parse(&[
            "--duration",
            "2.5",
            "report",
            "--channel",
            "2",
            "--device",
            "192.168.1.20:80",
        ])
        .unwrap();
        assert_eq!(options.command, Command::Report { channel: 2 });
        assert_eq!(options.duration, Some(Duration::from_millis(2500)));
        let device = options.device.unwrap();
        assert_eq!(device.address, Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(device.port, 80);
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(parse(&["frobnicate"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
        assert!(parse(&["--duration"]).is_err());
        assert!(parse(&["--duration", "-1"]).is_err());
        assert!(parse(&["--duration", "soon"]).is_err());
        assert!(parse(&["--device", "eco.local"]).is_err());
        assert!(parse(&["--channel", "x"]).is_err());
    }

    #[test]
    fn help_wins_over_commands() {
        assert_eq!(parse(&["list", "--help"]).unwrap().command, Command::Help);
        assert_eq!(parse(&["-h"]).unwrap().command, Command::Help);
    }
}
