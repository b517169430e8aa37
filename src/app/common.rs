use anyhow::{Context, Result};
use clap::{Arg, ArgMatches};
use log::{info, warn};
use popflex::auto::ExternalAutomorphismOracle;
use popflex::encoder::{
    AcyclicityOpt, CausalStructureOpt, EncoderOptions, EqualityOpt, OutputOpt, Preset, SymmetryOpt,
};
use popflex::io::{PlanFile, PlanReader};
use popflex::sat::FormulaMode;
use std::fs::File;
use std::io::BufReader;

pub(crate) const ARG_INPUT: &str = "INPUT";

pub(crate) fn input_arg() -> Arg<'static, 'static> {
    Arg::with_name(ARG_INPUT)
        .short("f")
        .empty_values(false)
        .multiple(false)
        .help("the input file that contains the plan")
        .required(true)
}

pub(crate) const ARG_PRESET: &str = "PRESET";
pub(crate) const ARG_SYMMETRY: &str = "SYMMETRY";
pub(crate) const ARG_EQUALITY: &str = "EQUALITY";
pub(crate) const ARG_ACYCLICITY: &str = "ACYCLICITY";
pub(crate) const ARG_CAUSAL_STRUCTURE: &str = "CAUSAL_STRUCTURE";
pub(crate) const ARG_OUTPUT_ORDER: &str = "OUTPUT_ORDER";
pub(crate) const ARG_CNF: &str = "CNF";

pub(crate) fn encoding_args() -> Vec<Arg<'static, 'static>> {
    vec![
        Arg::with_name(ARG_PRESET)
            .long("preset")
            .empty_values(false)
            .multiple(false)
            .possible_values(&[
                "md-orig", "mr-orig", "md", "mr", "mr-opsb", "mrd", "mrd-cssb", "mrr",
                "mrr-opsb", "mrr-cssb",
            ])
            .default_value("mrr")
            .help("the optimisation encoding preset"),
        Arg::with_name(ARG_SYMMETRY)
            .long("symmetry")
            .empty_values(false)
            .multiple(false)
            .possible_values(&["none", "op-types", "struct", "init-state", "op-val"])
            .help("override the preset's symmetry breaking strategy"),
        Arg::with_name(ARG_EQUALITY)
            .long("equality")
            .empty_values(false)
            .multiple(false)
            .possible_values(&["none", "atom", "idx"])
            .help("override the preset's equality encoding"),
        Arg::with_name(ARG_ACYCLICITY)
            .long("acyclicity")
            .empty_values(false)
            .multiple(false)
            .possible_values(&["atom", "binary"])
            .help("override the preset's acyclicity encoding"),
        Arg::with_name(ARG_CAUSAL_STRUCTURE)
            .long("causal-structure")
            .empty_values(false)
            .multiple(false)
            .possible_values(&["reorder", "deorder"])
            .help("override the preset's causal structure strategy"),
        Arg::with_name(ARG_OUTPUT_ORDER)
            .long("output-order")
            .empty_values(false)
            .multiple(false)
            .possible_values(&["partial-order", "total-order"])
            .help("the shape of the admitted orderings"),
        Arg::with_name(ARG_CNF)
            .long("cnf")
            .takes_value(false)
            .help("emit a plain CNF instance instead of a weighted one"),
    ]
}

pub(crate) fn options_from_matches(arg_matches: &ArgMatches<'_>) -> Result<EncoderOptions> {
    let preset = Preset::try_from(arg_matches.value_of(ARG_PRESET).unwrap())?;
    let mut options = preset.options();
    if let Some(v) = arg_matches.value_of(ARG_SYMMETRY) {
        options.symmetry = SymmetryOpt::try_from(v)?;
    }
    if let Some(v) = arg_matches.value_of(ARG_EQUALITY) {
        options.equality = EqualityOpt::try_from(v)?;
        options.ground = options.equality == EqualityOpt::None;
    }
    if let Some(v) = arg_matches.value_of(ARG_ACYCLICITY) {
        options.acyclicity = AcyclicityOpt::try_from(v)?;
    }
    if let Some(v) = arg_matches.value_of(ARG_CAUSAL_STRUCTURE) {
        options.causal_structure = CausalStructureOpt::try_from(v)?;
    }
    if let Some(v) = arg_matches.value_of(ARG_OUTPUT_ORDER) {
        options.output = OutputOpt::try_from(v)?;
    }
    if arg_matches.is_present(ARG_CNF) {
        options.mode = FormulaMode::Cnf;
    }
    Ok(options)
}

pub(crate) const ARG_ORACLE: &str = "ORACLE";
pub(crate) const ARG_ORACLE_OPTIONS: &str = "ORACLE_OPTIONS";

pub(crate) fn oracle_args() -> Vec<Arg<'static, 'static>> {
    vec![
        Arg::with_name(ARG_ORACLE)
            .long("automorphism-oracle")
            .empty_values(false)
            .multiple(false)
            .help("the external automorphism oracle (for the automorphism-derived symmetry strategies)"),
        Arg::with_name(ARG_ORACLE_OPTIONS)
            .long("automorphism-oracle-options")
            .empty_values(false)
            .multiple(false)
            .allow_hyphen_values(true)
            .requires(ARG_ORACLE)
            .help("the options to pass to the external automorphism oracle"),
    ]
}

pub(crate) fn oracle_from_matches(
    arg_matches: &ArgMatches<'_>,
) -> Option<ExternalAutomorphismOracle> {
    arg_matches.value_of(ARG_ORACLE).map(|program| {
        let options = arg_matches
            .value_of(ARG_ORACLE_OPTIONS)
            .map(|o| {
                o.split_ascii_whitespace()
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        ExternalAutomorphismOracle::new(program.to_string(), options)
    })
}

pub(crate) fn read_plan_file(file_path: &str) -> Result<PlanFile> {
    let mut reader = PlanReader::default();
    reader.add_warning_handler(Box::new(|line, msg| warn!("at line {}: {}", line, msg)));
    let file = File::open(file_path)
        .with_context(|| format!(r#"while opening the plan file "{}""#, file_path))?;
    let plan_file = reader.read(&mut BufReader::new(file))?;
    info!(
        "the plan has {} step(s) over {} object(s)",
        plan_file.steps.len(),
        plan_file.problem.objects().len(),
    );
    Ok(plan_file)
}
