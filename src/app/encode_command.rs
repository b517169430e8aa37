use super::cli_manager;
use super::command::Command;
use super::common;
use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::info;
use popflex::decode::SideTables;
use popflex::encoder::{CausalStructureOpt, SymmetryOpt, WcnfEncoder};
use popflex::io::write_side_tables;
use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

const CMD_NAME: &str = "encode";

const ARG_WCNF: &str = "WCNF";

pub(crate) struct EncodeCommand;

impl EncodeCommand {
    pub(crate) fn new() -> Self {
        EncodeCommand
    }
}

impl<'a> Command<'a> for EncodeCommand {
    fn name(&self) -> &str {
        CMD_NAME
    }

    fn clap_subcommand(&self) -> App<'a, 'a> {
        SubCommand::with_name(CMD_NAME)
            .about("Encodes a plan into a weighted CNF instance")
            .setting(AppSettings::DisableVersion)
            .arg(common::input_arg())
            .arg(
                Arg::with_name(ARG_WCNF)
                    .short("o")
                    .long("wcnf")
                    .empty_values(false)
                    .multiple(false)
                    .default_value("encoded.wcnf")
                    .help("the output WCNF file; side tables go next to it"),
            )
            .args(&common::encoding_args())
            .args(&common::oracle_args())
            .arg(cli_manager::logging_level_cli_arg())
    }

    fn execute(&self, arg_matches: &ArgMatches<'_>) -> Result<()> {
        let start = Instant::now();
        let options = common::options_from_matches(arg_matches)?;
        let plan_file = common::read_plan_file(arg_matches.value_of(common::ARG_INPUT).unwrap())?;
        let total_order = options.causal_structure != CausalStructureOpt::Reorder;
        let plan = plan_file.into_plan(total_order, options.ground)?;

        let oracle = common::oracle_from_matches(arg_matches);
        let encoder = WcnfEncoder::new(options.clone());
        let encoding = match (oracle, options.symmetry) {
            (Some(mut oracle), _) => encoder.encode_with_oracle(&plan, &mut oracle)?,
            (None, SymmetryOpt::None | SymmetryOpt::OpTypes) => encoder.encode(&plan)?,
            (None, _) => {
                return Err(anyhow::anyhow!(
                    "the {:?} symmetry strategy requires --automorphism-oracle",
                    options.symmetry
                ))
            }
        };
        info!(
            "encoded {} propositions and {} clauses in {:.3}s",
            encoding.formula.n_props(),
            encoding.formula.n_clauses(),
            start.elapsed().as_secs_f64()
        );
        if encoding.n_symmetry_clauses > 0 {
            info!(
                "of which {} symmetry breaking propositions and {} clauses",
                encoding.n_symmetry_props, encoding.n_symmetry_clauses
            );
        }

        let wcnf_path = arg_matches.value_of(ARG_WCNF).unwrap();
        info!("writing the instance to {}", wcnf_path);
        let mut wcnf_writer = BufWriter::new(
            File::create(wcnf_path)
                .with_context(|| format!(r#"while creating "{}""#, wcnf_path))?,
        );
        encoding.formula.write(&mut wcnf_writer)?;

        let tables = SideTables::new(&encoding, &plan);
        let tables_path = format!("{}.tables", wcnf_path);
        info!("writing the side tables to {}", tables_path);
        let mut tables_writer = BufWriter::new(
            File::create(&tables_path)
                .with_context(|| format!(r#"while creating "{}""#, tables_path))?,
        );
        write_side_tables(&tables, &mut tables_writer)?;
        Ok(())
    }
}
