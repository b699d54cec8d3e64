use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "miqat", version, author, about = "Prayer times, reminders and azan playback from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set location and calculation method (prompts for anything not given)
    Setup {
        /// Display name of the location
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        longitude: Option<f64>,
        /// Calculation method, e.g. MuslimWorldLeague, Karachi, NorthAmerica
        #[arg(long)]
        method: Option<String>,
    },
    /// Show today's prayer times and countdown to next prayer
    Times {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace pending reminders with the next occurrence of each prayer
    Schedule,
    /// List pending reminders
    Reminders,
    /// Azan playback
    Azan {
        #[command(subcommand)]
        action: AzanCommands,
    },
    /// Show or change preferences
    Prefs {
        /// Allow azan playback
        #[arg(long, value_enum)]
        azan: Option<Toggle>,
        /// Allow prayer reminders
        #[arg(long, value_enum)]
        notifications: Option<Toggle>,
    },
    /// Run in the background: fire reminders and play the azan
    Daemon,
}

#[derive(Subcommand, Debug)]
pub enum AzanCommands {
    /// Play the azan and wait until it finishes
    Play,
    /// Stop the azan
    Stop,
    /// Show whether the azan is playing
    Status,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_commands() {
        let cli = Cli::try_parse_from(["miqat", "azan", "play"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Azan { action: AzanCommands::Play })
        ));

        let cli = Cli::try_parse_from(["miqat", "prefs", "--azan", "off"]).unwrap();
        match cli.command {
            Some(Commands::Prefs { azan, notifications }) => {
                assert_eq!(azan, Some(Toggle::Off));
                assert_eq!(notifications, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn setup_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "miqat", "setup", "--latitude", "-33.87", "--longitude", "151.21",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Setup { latitude, .. }) => assert_eq!(latitude, Some(-33.87)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn no_subcommand_opens_dashboard() {
        assert!(Cli::try_parse_from(["miqat"]).unwrap().command.is_none());
    }
}
