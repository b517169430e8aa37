use super::cli_manager;
use super::command::Command;
use anyhow::Result;
use clap::{App, AppSettings, ArgMatches, SubCommand};
use popflex::encoder::Preset;

const CMD_NAME: &str = "presets";

pub(crate) struct PresetsCommand;

impl PresetsCommand {
    pub(crate) fn new() -> Self {
        PresetsCommand
    }
}

impl<'a> Command<'a> for PresetsCommand {
    fn name(&self) -> &str {
        CMD_NAME
    }

    fn clap_subcommand(&self) -> App<'a, 'a> {
        SubCommand::with_name(CMD_NAME)
            .about("Lists the available optimisation encoding presets")
            .setting(AppSettings::DisableVersion)
            .arg(cli_manager::logging_level_cli_arg())
    }

    fn execute(&self, _arg_matches: &ArgMatches<'_>) -> Result<()> {
        for preset in Preset::all() {
            println!("{:10} {}", preset.name(), preset.description());
        }
        Ok(())
    }
}
