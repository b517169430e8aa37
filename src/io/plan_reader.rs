use crate::lang::{
    Atom, Constant, Domain, Literal, Operator, Plan, Predicate, Problem, Substitution, Term, Type,
    Variable,
};
use crate::pct::minimal_causal_structure;
use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

/// The type of callback functions to call when warnings are raised while
/// parsing a plan file.
pub type WarningHandler = Box<dyn Fn(usize, String)>;

const SYMBOL_PATTERN: &str = r"[A-Za-z][A-Za-z0-9_-]*";

lazy_static! {
    static ref TYPE_LINE: Regex = Regex::new(&format!(
        r"^type\s+({})\s+({})$",
        SYMBOL_PATTERN, SYMBOL_PATTERN
    ))
    .unwrap();
    static ref PREDICATE_LINE: Regex = Regex::new(&format!(
        r"^predicate\s+({})((?:\s+{})*)$",
        SYMBOL_PATTERN, SYMBOL_PATTERN
    ))
    .unwrap();
    static ref OBJECT_LINE: Regex = Regex::new(&format!(
        r"^object\s+({})\s+({})$",
        SYMBOL_PATTERN, SYMBOL_PATTERN
    ))
    .unwrap();
    static ref STEP_LINE: Regex = Regex::new(&format!(
        r"^step\s+({})((?:\s+{}:{})*)$",
        SYMBOL_PATTERN, SYMBOL_PATTERN, SYMBOL_PATTERN
    ))
    .unwrap();
    static ref COND_LINE: Regex = Regex::new(&format!(
        r"^(pre|post)\s+(-?)({})((?:\s+{})*)$",
        SYMBOL_PATTERN, SYMBOL_PATTERN
    ))
    .unwrap();
    static ref BIND_LINE: Regex = Regex::new(&format!(
        r"^bind\s+({})\s+({})$",
        SYMBOL_PATTERN, SYMBOL_PATTERN
    ))
    .unwrap();
}

/// The content of a lifted-plan file: the problem, the ordered step list and
/// the original total binding.
///
/// The causal structure depends on the encoding options, so it is computed
/// when the file is turned into a [`Plan`] with [`PlanFile::into_plan`].
#[derive(Debug)]
pub struct PlanFile {
    /// The planning instance.
    pub problem: Problem,
    /// The ordered step list, `init` first and `goal` last.
    pub steps: Vec<Operator<Variable>>,
    /// The original total binding of every step variable.
    pub substitution: Substitution,
}

impl PlanFile {
    /// Builds the plan, computing its minimal causal structure.
    ///
    /// When `total_order` is set only original-order producers are recorded;
    /// when `ground` is set candidate links are matched on ground literals.
    pub fn into_plan(self, total_order: bool, ground: bool) -> Result<Plan> {
        let constraints =
            minimal_causal_structure(&self.steps, &self.substitution, total_order, ground);
        Plan::new(self.problem, self.steps, self.substitution, constraints)
    }
}

/// A reader for the line-oriented lifted-plan format.
///
/// The format lists, in order: the type hierarchy (`type <name> <super>`,
/// with `object` predefined as the root), the predicates
/// (`predicate <name> <param-type>*`), the objects (`object <name> <type>`),
/// and the steps in plan order. Each step opens with
/// `step <name> <var>:<type>*` followed by its `pre`/`post` condition lines
/// (`pre [-]<predicate> <var>*`) and one `bind <var> <object>` line per
/// variable. Blank lines and lines starting with `#` are skipped.
///
/// # Example
///
/// ```
/// # use popflex::io::PlanReader;
/// let reader = PlanReader::default();
/// let content = r#"
/// predicate held object
/// object world object
/// step init d0:object
/// post held d0
/// bind d0 world
/// step goal g0:object
/// pre held g0
/// bind g0 world
/// "#;
/// let plan_file = reader.read(&mut content.as_bytes()).expect("invalid plan");
/// assert_eq!(2, plan_file.steps.len());
/// ```
#[derive(Default)]
pub struct PlanReader {
    warning_handlers: Vec<WarningHandler>,
}

struct ParserState {
    types: Vec<Type>,
    predicates: HashMap<String, Predicate>,
    objects: HashMap<String, Constant>,
    steps: Vec<Operator<Variable>>,
    current: Option<CurrentStep>,
    substitution: Substitution,
}

struct CurrentStep {
    name: String,
    parameters: Vec<Variable>,
    preconditions: Vec<Literal<Variable>>,
    postconditions: Vec<Literal<Variable>>,
}

impl CurrentStep {
    fn into_operator(self) -> Operator<Variable> {
        Operator::new(
            &self.name,
            self.parameters,
            self.preconditions,
            self.postconditions,
        )
    }
}

impl PlanReader {
    /// Adds a callback function to call when warnings are raised while
    /// parsing a plan file.
    pub fn add_warning_handler(&mut self, handler: WarningHandler) {
        self.warning_handlers.push(handler);
    }

    fn warn(&self, line: usize, message: String) {
        for h in &self.warning_handlers {
            h(line, message.clone());
        }
    }

    /// Reads a plan file.
    pub fn read(&self, reader: &mut dyn Read) -> Result<PlanFile> {
        let mut state = ParserState {
            types: vec![Type::root()],
            predicates: HashMap::new(),
            objects: HashMap::new(),
            steps: Vec::new(),
            current: None,
            substitution: Substitution::new(),
        };
        for (i, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.context("while reading a plan file")?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.read_line(&mut state, line, i + 1)
                .with_context(|| format!("while parsing line {} of a plan file", i + 1))?;
        }
        if let Some(current) = state.current.take() {
            state.steps.push(current.into_operator());
        }
        let mut objects: Vec<Constant> = state.objects.into_values().collect();
        objects.sort();
        let init_facts = ground_facts(&state.steps, &state.substitution, true)?;
        let goal_facts = ground_facts(&state.steps, &state.substitution, false)?;
        let mut predicates: Vec<Predicate> = state.predicates.into_values().collect();
        predicates.sort_by(|a, b| a.name().cmp(b.name()));
        let domain = Domain::new(state.types, predicates, Vec::new());
        let problem = Problem::new(domain, objects, init_facts, goal_facts);
        Ok(PlanFile {
            problem,
            steps: state.steps,
            substitution: state.substitution,
        })
    }

    fn read_line(&self, state: &mut ParserState, line: &str, line_number: usize) -> Result<()> {
        if let Some(c) = TYPE_LINE.captures(line) {
            let (name, supertype) = (&c[1], &c[2]);
            if state.types.iter().any(|t| t.name() == name) {
                self.warn(line_number, format!(r#"type "{}" is already declared"#, name));
                return Ok(());
            }
            let supertype = state
                .types
                .iter()
                .find(|t| t.name() == supertype)
                .ok_or_else(|| anyhow!(r#"undeclared supertype "{}""#, supertype))?;
            let new_type = Type::new_subtype(name, supertype);
            state.types.push(new_type);
            return Ok(());
        }
        if let Some(c) = PREDICATE_LINE.captures(line) {
            let name = &c[1];
            if state.predicates.contains_key(name) {
                self.warn(
                    line_number,
                    format!(r#"predicate "{}" is already declared"#, name),
                );
                return Ok(());
            }
            let mut param_types = Vec::new();
            for w in c[2].split_ascii_whitespace() {
                let t = state
                    .types
                    .iter()
                    .find(|t| t.name() == w)
                    .ok_or_else(|| anyhow!(r#"undeclared type "{}""#, w))?;
                param_types.push(t.clone());
            }
            state
                .predicates
                .insert(name.to_string(), Predicate::new(name, param_types));
            return Ok(());
        }
        if let Some(c) = OBJECT_LINE.captures(line) {
            let (name, type_name) = (&c[1], &c[2]);
            if state.objects.contains_key(name) {
                self.warn(
                    line_number,
                    format!(r#"object "{}" is already declared"#, name),
                );
                return Ok(());
            }
            let t = state
                .types
                .iter()
                .find(|t| t.name() == type_name)
                .ok_or_else(|| anyhow!(r#"undeclared type "{}""#, type_name))?;
            state
                .objects
                .insert(name.to_string(), Constant::new(name, t.clone()));
            return Ok(());
        }
        if let Some(c) = STEP_LINE.captures(line) {
            if let Some(current) = state.current.take() {
                state.steps.push(current.into_operator());
            }
            let mut parameters = Vec::new();
            for w in c[2].split_ascii_whitespace() {
                let (var_name, type_name) = w.split_once(':').unwrap();
                let t = state
                    .types
                    .iter()
                    .find(|t| t.name() == type_name)
                    .ok_or_else(|| anyhow!(r#"undeclared type "{}""#, type_name))?;
                parameters.push(Variable::new(var_name, t.clone()));
            }
            state.current = Some(CurrentStep {
                name: c[1].to_string(),
                parameters,
                preconditions: Vec::new(),
                postconditions: Vec::new(),
            });
            return Ok(());
        }
        if let Some(c) = COND_LINE.captures(line) {
            let current = state
                .current
                .as_mut()
                .ok_or_else(|| anyhow!("condition line outside of a step"))?;
            let predicate = state
                .predicates
                .get(&c[3])
                .ok_or_else(|| anyhow!(r#"undeclared predicate "{}""#, &c[3]))?;
            let mut params = Vec::new();
            for w in c[4].split_ascii_whitespace() {
                let v = current
                    .parameters
                    .iter()
                    .find(|v| v.name() == w)
                    .ok_or_else(|| {
                        anyhow!(r#"variable "{}" is not a parameter of the step"#, w)
                    })?;
                params.push(v.clone());
            }
            if params.len() != predicate.arity() {
                return Err(anyhow!(
                    r#"predicate "{}" expects {} parameter(s), got {}"#,
                    predicate.name(),
                    predicate.arity(),
                    params.len()
                ));
            }
            for (v, t) in params.iter().zip(predicate.parameter_types().iter()) {
                if !t.has_subtype(v.term_type()) && !v.term_type().has_subtype(t) {
                    return Err(anyhow!(
                        r#"variable "{}" is incompatible with the {} parameter of "{}""#,
                        v.name(),
                        t,
                        predicate.name()
                    ));
                }
            }
            let literal = Literal::new(Atom::new(predicate.clone(), params), c[2].is_empty());
            if &c[1] == "pre" {
                current.preconditions.push(literal);
            } else {
                current.postconditions.push(literal);
            }
            return Ok(());
        }
        if let Some(c) = BIND_LINE.captures(line) {
            let current = state
                .current
                .as_ref()
                .ok_or_else(|| anyhow!("bind line outside of a step"))?;
            let v = current
                .parameters
                .iter()
                .find(|v| v.name() == &c[1])
                .ok_or_else(|| {
                    anyhow!(r#"variable "{}" is not a parameter of the step"#, &c[1])
                })?;
            let value = state
                .objects
                .get(&c[2])
                .ok_or_else(|| anyhow!(r#"undeclared object "{}""#, &c[2]))?;
            if !v.term_type().has_subtype(value.term_type()) {
                return Err(anyhow!(
                    r#"object "{}" is outside the domain of variable "{}""#,
                    value.name(),
                    v.name()
                ));
            }
            state.substitution.bind(v.clone(), value.clone());
            return Ok(());
        }
        Err(anyhow!(r#"unrecognized line "{}""#, line))
    }
}

fn ground_facts(
    steps: &[Operator<Variable>],
    sub: &Substitution,
    init: bool,
) -> Result<Vec<Literal<Constant>>> {
    let step = steps
        .iter()
        .find(|s| if init { s.is_init() } else { s.is_goal() })
        .ok_or_else(|| anyhow!("missing {} step", if init { "init" } else { "goal" }))?;
    let lits = if init {
        step.postconditions()
    } else {
        step.preconditions()
    };
    lits.iter()
        .map(|l| {
            l.parameters()
                .iter()
                .find(|v| !sub.binds(v))
                .map_or_else(
                    || Ok(l.apply_sub(sub)),
                    |v| Err(anyhow!(r#"variable "{}" is unbound"#, v.name())),
                )
        })
        .collect()
}
