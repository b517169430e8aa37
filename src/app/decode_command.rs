use super::cli_manager;
use super::command::Command;
use super::common;
use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::info;
use popflex::decode::Decoder;
use popflex::io::{read_side_tables, write_pop};
use popflex::sat::Model;
use std::fs::File;
use std::io::{BufReader, BufWriter};

const CMD_NAME: &str = "decode";

const ARG_TABLES: &str = "TABLES";
const ARG_MODEL: &str = "MODEL";
const ARG_POP: &str = "POP";

pub(crate) struct DecodeCommand;

impl DecodeCommand {
    pub(crate) fn new() -> Self {
        DecodeCommand
    }
}

impl<'a> Command<'a> for DecodeCommand {
    fn name(&self) -> &str {
        CMD_NAME
    }

    fn clap_subcommand(&self) -> App<'a, 'a> {
        SubCommand::with_name(CMD_NAME)
            .about("Decodes a solver model into a partial-order plan")
            .setting(AppSettings::DisableVersion)
            .arg(common::input_arg())
            .arg(
                Arg::with_name(ARG_TABLES)
                    .short("t")
                    .long("tables")
                    .empty_values(false)
                    .multiple(false)
                    .default_value("encoded.wcnf.tables")
                    .help("the side tables written by the encode command"),
            )
            .arg(
                Arg::with_name(ARG_MODEL)
                    .short("m")
                    .long("model")
                    .empty_values(false)
                    .multiple(false)
                    .help("the model file returned by the MaxSAT solver")
                    .required(true),
            )
            .arg(
                Arg::with_name(ARG_POP)
                    .short("o")
                    .long("pop")
                    .empty_values(false)
                    .multiple(false)
                    .default_value("optimised.pop")
                    .help("the output partial-order plan file"),
            )
            .arg(cli_manager::logging_level_cli_arg())
    }

    fn execute(&self, arg_matches: &ArgMatches<'_>) -> Result<()> {
        let plan_file = common::read_plan_file(arg_matches.value_of(common::ARG_INPUT).unwrap())?;
        let plan = plan_file.into_plan(false, false)?;

        let tables_path = arg_matches.value_of(ARG_TABLES).unwrap();
        let tables_file = File::open(tables_path)
            .with_context(|| format!(r#"while opening the side tables "{}""#, tables_path))?;
        let tables = read_side_tables(&mut BufReader::new(tables_file))?;

        let model_path = arg_matches.value_of(ARG_MODEL).unwrap();
        let model_file = File::open(model_path)
            .with_context(|| format!(r#"while opening the model "{}""#, model_path))?;
        let model = Model::from_read(&mut BufReader::new(model_file))?;

        let decoded = Decoder::new(&plan, &tables).decode(&model);
        info!("order relation size: {}", decoded.closed_size);
        info!("flex: {}", decoded.flex);

        let pop_path = arg_matches.value_of(ARG_POP).unwrap();
        info!("writing the partial-order plan to {}", pop_path);
        let mut writer = BufWriter::new(
            File::create(pop_path).with_context(|| format!(r#"while creating "{}""#, pop_path))?,
        );
        write_pop(&plan, &decoded, &mut writer)
    }
}
