use crate::sat::FormulaMode;
use crate::utils::DirectedGraph;
use anyhow::{anyhow, Result};

/// The symmetry breaking strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymmetryOpt {
    /// No symmetry breaking.
    None,
    /// Canonical ordering among operator pairs of the same schema.
    OpTypes,
    /// Automorphism-derived structural lex-leaders, plus same-schema
    /// operator-pair lex-leaders.
    Struct,
    /// Automorphism-derived structural lex-leaders only.
    InitState,
    /// Object and operator lex-leaders from classified automorphisms.
    OpVal,
}

impl TryFrom<&str> for SymmetryOpt {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(SymmetryOpt::None),
            "op-types" => Ok(SymmetryOpt::OpTypes),
            "struct" => Ok(SymmetryOpt::Struct),
            "init-state" => Ok(SymmetryOpt::InitState),
            "op-val" => Ok(SymmetryOpt::OpVal),
            _ => Err(anyhow!(r#"undefined symmetry strategy "{}""#, value)),
        }
    }
}

/// The acyclicity/transitive-closure encoding of the precedence relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcyclicityOpt {
    /// One proposition per ordered pair, explicit transitivity clauses.
    Atom,
    /// Binary operator indices compared by a ripple bit comparator.
    Binary,
}

impl TryFrom<&str> for AcyclicityOpt {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "atom" => Ok(AcyclicityOpt::Atom),
            "binary" => Ok(AcyclicityOpt::Binary),
            _ => Err(anyhow!(r#"undefined acyclicity encoding "{}""#, value)),
        }
    }
}

/// The equality-closure encoding for lifted plans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EqualityOpt {
    /// No equality closure (ground encodings).
    None,
    /// Pairwise equality propositions closed under transitivity.
    Atom,
    /// Per-variable domain assignments; equality is derived, not closed.
    Idx,
}

impl TryFrom<&str> for EqualityOpt {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(EqualityOpt::None),
            "atom" => Ok(EqualityOpt::Atom),
            "idx" => Ok(EqualityOpt::Idx),
            _ => Err(anyhow!(r#"undefined equality encoding "{}""#, value)),
        }
    }
}

/// The causal-structure filtering strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CausalStructureOpt {
    /// Any producer may justify any consumer.
    Reorder,
    /// Only original-order producers may justify a consumer.
    Deorder,
    /// Only links consistent with a supplied precedence graph are kept.
    Custom,
}

impl TryFrom<&str> for CausalStructureOpt {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "reorder" => Ok(CausalStructureOpt::Reorder),
            "deorder" => Ok(CausalStructureOpt::Deorder),
            "custom" => Ok(CausalStructureOpt::Custom),
            _ => Err(anyhow!(r#"undefined causal structure strategy "{}""#, value)),
        }
    }
}

/// The shape of the ordering the encoding admits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputOpt {
    /// Models may leave step pairs unordered.
    PartialOrder,
    /// Every pair of steps is ordered one way or the other.
    TotalOrder,
}

impl TryFrom<&str> for OutputOpt {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "partial-order" => Ok(OutputOpt::PartialOrder),
            "total-order" => Ok(OutputOpt::TotalOrder),
            _ => Err(anyhow!(r#"undefined output strategy "{}""#, value)),
        }
    }
}

/// The full configuration of an encoding run.
#[derive(Clone, Debug)]
pub struct EncoderOptions {
    /// The kind of formula to produce; `Wcnf` adds the soft ordering clauses.
    pub mode: FormulaMode,
    /// The symmetry breaking strategy.
    pub symmetry: SymmetryOpt,
    /// The equality-closure encoding.
    pub equality: EqualityOpt,
    /// The acyclicity encoding.
    pub acyclicity: AcyclicityOpt,
    /// The causal-structure filtering strategy.
    pub causal_structure: CausalStructureOpt,
    /// The shape of the admitted orderings.
    pub output: OutputOpt,
    /// When set, transitive-closure propositions are only materialized over
    /// pairs already reachable through existing propositions.
    pub filter_transitive_closure: bool,
    /// When set, literals are compared after full substitution and no
    /// equality closure is built.
    pub ground: bool,
    /// The precedence graph (over step indices) backing the `Custom`
    /// causal-structure strategy.
    pub custom_precedence: Option<DirectedGraph<usize>>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            mode: FormulaMode::Wcnf,
            symmetry: SymmetryOpt::None,
            equality: EqualityOpt::Atom,
            acyclicity: AcyclicityOpt::Atom,
            causal_structure: CausalStructureOpt::Reorder,
            output: OutputOpt::PartialOrder,
            filter_transitive_closure: true,
            ground: false,
            custom_precedence: None,
        }
    }
}

/// A named preset configuration.
///
/// Presets map to the optimisation encodings of the literature: minimum
/// deorder and reorder over the original instantiation, and their
/// reinstantiated variants, with optional symmetry breaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    /// Minimum deorder, unfiltered transitive closure.
    MdOrig,
    /// Minimum reorder, unfiltered transitive closure.
    MrOrig,
    /// Minimum deorder.
    Md,
    /// Minimum reorder.
    Mr,
    /// Minimum reorder with operator-type symmetry breaking.
    MrOpsb,
    /// Minimum reinstantiated deorder.
    Mrd,
    /// Minimum reinstantiated deorder with structural symmetry breaking.
    MrdCssb,
    /// Minimum reinstantiated reorder.
    Mrr,
    /// Minimum reinstantiated reorder with operator-type symmetry breaking.
    MrrOpsb,
    /// Minimum reinstantiated reorder with causal-structure symmetry
    /// breaking.
    MrrCssb,
}

impl Preset {
    /// Returns every preset, in presentation order.
    pub fn all() -> [Preset; 10] {
        [
            Preset::MdOrig,
            Preset::MrOrig,
            Preset::Md,
            Preset::Mr,
            Preset::MrOpsb,
            Preset::Mrd,
            Preset::MrdCssb,
            Preset::Mrr,
            Preset::MrrOpsb,
            Preset::MrrCssb,
        ]
    }

    /// Returns the CLI name of the preset.
    pub fn name(&self) -> &'static str {
        match self {
            Preset::MdOrig => "md-orig",
            Preset::MrOrig => "mr-orig",
            Preset::Md => "md",
            Preset::Mr => "mr",
            Preset::MrOpsb => "mr-opsb",
            Preset::Mrd => "mrd",
            Preset::MrdCssb => "mrd-cssb",
            Preset::Mrr => "mrr",
            Preset::MrrOpsb => "mrr-opsb",
            Preset::MrrCssb => "mrr-cssb",
        }
    }

    /// Returns a one-line description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            Preset::MdOrig => "minimum deorder, unfiltered transitive closure",
            Preset::MrOrig => "minimum reorder, unfiltered transitive closure",
            Preset::Md => "minimum deorder",
            Preset::Mr => "minimum reorder",
            Preset::MrOpsb => "minimum reorder, operator-type symmetry breaking",
            Preset::Mrd => "minimum reinstantiated deorder",
            Preset::MrdCssb => "minimum reinstantiated deorder, structural symmetry breaking",
            Preset::Mrr => "minimum reinstantiated reorder",
            Preset::MrrOpsb => "minimum reinstantiated reorder, operator-type symmetry breaking",
            Preset::MrrCssb => {
                "minimum reinstantiated reorder, causal-structure symmetry breaking"
            }
        }
    }

    /// Returns the options the preset maps to.
    pub fn options(&self) -> EncoderOptions {
        let build = |ground: bool,
                     causal_structure: CausalStructureOpt,
                     symmetry: SymmetryOpt,
                     equality: EqualityOpt,
                     filter_transitive_closure: bool| EncoderOptions {
            mode: FormulaMode::Wcnf,
            symmetry,
            equality,
            acyclicity: AcyclicityOpt::Atom,
            causal_structure,
            output: OutputOpt::PartialOrder,
            filter_transitive_closure,
            ground,
            custom_precedence: None,
        };
        match self {
            Preset::MdOrig => build(
                true,
                CausalStructureOpt::Deorder,
                SymmetryOpt::None,
                EqualityOpt::None,
                false,
            ),
            Preset::MrOrig => build(
                true,
                CausalStructureOpt::Reorder,
                SymmetryOpt::None,
                EqualityOpt::None,
                false,
            ),
            Preset::Md => build(
                true,
                CausalStructureOpt::Deorder,
                SymmetryOpt::None,
                EqualityOpt::None,
                true,
            ),
            Preset::Mr => build(
                true,
                CausalStructureOpt::Reorder,
                SymmetryOpt::None,
                EqualityOpt::None,
                true,
            ),
            Preset::MrOpsb => build(
                true,
                CausalStructureOpt::Reorder,
                SymmetryOpt::OpTypes,
                EqualityOpt::None,
                true,
            ),
            Preset::Mrd => build(
                false,
                CausalStructureOpt::Deorder,
                SymmetryOpt::None,
                EqualityOpt::Atom,
                true,
            ),
            Preset::MrdCssb => build(
                false,
                CausalStructureOpt::Deorder,
                SymmetryOpt::InitState,
                EqualityOpt::Atom,
                true,
            ),
            Preset::Mrr => build(
                false,
                CausalStructureOpt::Reorder,
                SymmetryOpt::None,
                EqualityOpt::Atom,
                true,
            ),
            Preset::MrrOpsb => build(
                false,
                CausalStructureOpt::Reorder,
                SymmetryOpt::OpTypes,
                EqualityOpt::Atom,
                true,
            ),
            Preset::MrrCssb => build(
                false,
                CausalStructureOpt::Reorder,
                SymmetryOpt::Struct,
                EqualityOpt::Atom,
                true,
            ),
        }
    }
}

impl TryFrom<&str> for Preset {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Preset::all()
            .into_iter()
            .find(|p| p.name() == value.to_ascii_lowercase())
            .ok_or_else(|| anyhow!(r#"undefined preset "{}""#, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_names_round_trip() {
        for p in Preset::all() {
            assert_eq!(p, Preset::try_from(p.name()).unwrap());
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert!(Preset::try_from("foo").is_err());
    }

    #[test]
    fn test_mrr_options() {
        let opts = Preset::Mrr.options();
        assert!(!opts.ground);
        assert_eq!(CausalStructureOpt::Reorder, opts.causal_structure);
        assert_eq!(EqualityOpt::Atom, opts.equality);
        assert_eq!(SymmetryOpt::None, opts.symmetry);
        assert!(opts.filter_transitive_closure);
    }

    #[test]
    fn test_md_is_ground_deorder() {
        let opts = Preset::Md.options();
        assert!(opts.ground);
        assert_eq!(CausalStructureOpt::Deorder, opts.causal_structure);
        assert_eq!(EqualityOpt::None, opts.equality);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            SymmetryOpt::OpTypes,
            SymmetryOpt::try_from("OP-TYPES").unwrap()
        );
        assert_eq!(AcyclicityOpt::Binary, AcyclicityOpt::try_from("binary").unwrap());
        assert_eq!(EqualityOpt::Idx, EqualityOpt::try_from("idx").unwrap());
        assert_eq!(
            CausalStructureOpt::Deorder,
            CausalStructureOpt::try_from("deorder").unwrap()
        );
        assert_eq!(
            OutputOpt::TotalOrder,
            OutputOpt::try_from("total-order").unwrap()
        );
        assert!(SymmetryOpt::try_from("foo").is_err());
    }
}
