//! The closed set of plotting operations and their keyword policy
//!
//! Each operation names the runtime callable it dispatches to and the
//! keyword values that must not travel as plain strings. Keys an operation
//! does not list are passed through as strings.

use plotbridge_runtime::{Coercion, CoercionTable};

/// Callable and keyword coercions of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpSpec {
    /// Attribute name on the owning module or object
    pub callable: &'static str,
    pub coercions: CoercionTable,
}

const NO_COERCIONS: CoercionTable = &[];

const FILL_BETWEEN: CoercionTable = &[("alpha", Coercion::Float)];

const ARROW: CoercionTable = &[
    ("width", Coercion::Float),
    ("head_width", Coercion::Float),
    ("head_length", Coercion::Float),
    ("overhang", Coercion::Float),
    ("length_includes_head", Coercion::Bool),
    ("head_starts_at_zero", Coercion::Bool),
];

const AXVSPAN: CoercionTable = &[("linewidth", Coercion::Float), ("alpha", Coercion::Float)];

const RC_PARAMS: CoercionTable = &[("text.usetex", Coercion::Int)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // pyplot
    Plot,
    Scatter,
    Hist,
    Bar,
    FillBetween,
    Arrow,
    Errorbar,
    Contour,
    Boxplot,
    Text,
    Annotate,
    Title,
    Suptitle,
    Xlabel,
    Ylabel,
    Legend,
    Grid,
    Axhline,
    Axvline,
    Axvspan,
    Xlim,
    Ylim,
    Xticks,
    Yticks,
    Subplot,
    Subplots,
    Figure,
    FignumExists,
    Gca,
    Gcf,
    Twinx,
    Twiny,
    RcParams,
    RcParamsUpdate,
    SubplotsAdjust,
    Savefig,
    Show,
    Close,
    Clf,
    Pause,
    TightLayout,
    Ginput,
    // Axes methods
    SetXlim,
    SetYlim,
    SetXlabel,
    SetYlabel,
    SetTitle,
    SetXticks,
    SetYticks,
    Cla,
}

impl Op {
    pub const fn spec(self) -> OpSpec {
        let (callable, coercions) = match self {
            Op::Plot => ("plot", NO_COERCIONS),
            Op::Scatter => ("scatter", NO_COERCIONS),
            Op::Hist => ("hist", NO_COERCIONS),
            Op::Bar => ("bar", NO_COERCIONS),
            Op::FillBetween => ("fill_between", FILL_BETWEEN),
            Op::Arrow => ("arrow", ARROW),
            Op::Errorbar => ("errorbar", NO_COERCIONS),
            Op::Contour => ("contour", NO_COERCIONS),
            Op::Boxplot => ("boxplot", NO_COERCIONS),
            Op::Text => ("text", NO_COERCIONS),
            Op::Annotate => ("annotate", NO_COERCIONS),
            Op::Title => ("title", NO_COERCIONS),
            Op::Suptitle => ("suptitle", NO_COERCIONS),
            Op::Xlabel => ("xlabel", NO_COERCIONS),
            Op::Ylabel => ("ylabel", NO_COERCIONS),
            Op::Legend => ("legend", NO_COERCIONS),
            Op::Grid => ("grid", NO_COERCIONS),
            Op::Axhline => ("axhline", NO_COERCIONS),
            Op::Axvline => ("axvline", NO_COERCIONS),
            Op::Axvspan => ("axvspan", AXVSPAN),
            Op::Xlim => ("xlim", NO_COERCIONS),
            Op::Ylim => ("ylim", NO_COERCIONS),
            Op::Xticks => ("xticks", NO_COERCIONS),
            Op::Yticks => ("yticks", NO_COERCIONS),
            Op::Subplot => ("subplot", NO_COERCIONS),
            Op::Subplots => ("subplots", NO_COERCIONS),
            Op::Figure => ("figure", NO_COERCIONS),
            Op::FignumExists => ("fignum_exists", NO_COERCIONS),
            Op::Gca => ("gca", NO_COERCIONS),
            Op::Gcf => ("gcf", NO_COERCIONS),
            Op::Twinx => ("twinx", NO_COERCIONS),
            Op::Twiny => ("twiny", NO_COERCIONS),
            Op::RcParams => ("rcParams", NO_COERCIONS),
            Op::RcParamsUpdate => ("update", RC_PARAMS),
            Op::SubplotsAdjust => ("subplots_adjust", NO_COERCIONS),
            Op::Savefig => ("savefig", NO_COERCIONS),
            Op::Show => ("show", NO_COERCIONS),
            Op::Close => ("close", NO_COERCIONS),
            Op::Clf => ("clf", NO_COERCIONS),
            Op::Pause => ("pause", NO_COERCIONS),
            Op::TightLayout => ("tight_layout", NO_COERCIONS),
            Op::Ginput => ("ginput", NO_COERCIONS),
            Op::SetXlim => ("set_xlim", NO_COERCIONS),
            Op::SetYlim => ("set_ylim", NO_COERCIONS),
            Op::SetXlabel => ("set_xlabel", NO_COERCIONS),
            Op::SetYlabel => ("set_ylabel", NO_COERCIONS),
            Op::SetTitle => ("set_title", NO_COERCIONS),
            Op::SetXticks => ("set_xticks", NO_COERCIONS),
            Op::SetYticks => ("set_yticks", NO_COERCIONS),
            Op::Cla => ("cla", NO_COERCIONS),
        };
        OpSpec { callable, coercions }
    }

    #[inline]
    pub const fn callable(self) -> &'static str {
        self.spec().callable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotbridge_runtime::marshal::coercion_for;

    #[test]
    fn test_coercion_policy() {
        let fill = Op::FillBetween.spec();
        assert_eq!(coercion_for(fill.coercions, "alpha"), Coercion::Float);
        assert_eq!(coercion_for(fill.coercions, "color"), Coercion::Str);

        let arrow = Op::Arrow.spec();
        assert_eq!(coercion_for(arrow.coercions, "head_width"), Coercion::Float);
        assert_eq!(coercion_for(arrow.coercions, "head_starts_at_zero"), Coercion::Bool);

        assert_eq!(coercion_for(Op::Axvspan.spec().coercions, "linewidth"), Coercion::Float);
        assert_eq!(coercion_for(Op::RcParamsUpdate.spec().coercions, "text.usetex"), Coercion::Int);
        // `alpha` is only special where the operation says so.
        assert_eq!(coercion_for(Op::Plot.spec().coercions, "alpha"), Coercion::Str);
    }

    #[test]
    fn test_vertical_line_calls_axvline() {
        assert_eq!(Op::Axvline.callable(), "axvline");
        assert_eq!(Op::Axhline.callable(), "axhline");
    }
}
