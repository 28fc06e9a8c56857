//! Module-level plotting calls
//!
//! Every method is parameter plumbing: it checks paired argument lengths,
//! marshals its arguments and runs one dispatcher call on `pyplot`. String
//! keywords are coerced per [`Op`]'s table; everything else is passed as a
//! string.

use crate::axes::Axes;
use crate::figure::{Figure, SaveOptions};
use crate::invoke::{check_len, OpCall};
use crate::ops::Op;
use plotbridge_runtime::{Keywords, Module, Result, Session, ToForeign};
use std::collections::BTreeMap;

/// `hist` options
#[derive(Debug, Clone, PartialEq)]
pub struct HistOptions {
    pub bins: i64,
    pub color: String,
    pub alpha: f64,
    pub cumulative: bool,
}

impl Default for HistOptions {
    fn default() -> Self {
        Self {
            bins: 10,
            color: "b".to_string(),
            alpha: 1.0,
            cumulative: false,
        }
    }
}

/// Bar outline: edge color, line style, line width
#[derive(Debug, Clone, PartialEq)]
pub struct BarStyle {
    pub edge_color: String,
    pub line_style: String,
    pub line_width: f64,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            edge_color: "black".to_string(),
            line_style: "-".to_string(),
            line_width: 1.0,
        }
    }
}

/// Pyplot facade bound to one session
#[derive(Debug, Clone, Copy)]
pub struct Plot<'s> {
    session: &'s Session<'s>,
}

impl<'s> Plot<'s> {
    pub fn new(session: &'s Session<'s>) -> Self {
        Self { session }
    }

    #[inline]
    pub fn session(&self) -> &'s Session<'s> {
        self.session
    }

    fn call(&self, op: Op) -> OpCall<'s> {
        OpCall::new(self.session, op)
    }

    pub fn plot<X, Y>(&self, x: &[X], y: &[Y], format: &str, keywords: &Keywords) -> Result<()>
    where
        X: ToForeign,
        Y: ToForeign,
    {
        check_len("plot", "y", x.len(), y.len())?;
        self.call(Op::Plot)
            .arg(x)?
            .arg(y)?
            .arg(format)?
            .keywords(keywords)?
            .invoke()?;
        Ok(())
    }

    /// Plot `y` against its indices
    pub fn plot_y<Y: ToForeign>(&self, y: &[Y], format: &str, keywords: &Keywords) -> Result<()> {
        let x: Vec<usize> = (0..y.len()).collect();
        self.plot(&x, y, format, keywords)
    }

    /// `size` is the marker area `s`
    pub fn scatter<X, Y>(&self, x: &[X], y: &[Y], size: f64, keywords: &Keywords) -> Result<()>
    where
        X: ToForeign,
        Y: ToForeign,
    {
        check_len("scatter", "y", x.len(), y.len())?;
        self.call(Op::Scatter)
            .arg(x)?
            .arg(y)?
            .keywords(keywords)?
            .kwarg("s", &size)?
            .invoke()?;
        Ok(())
    }

    pub fn hist<Y: ToForeign>(&self, y: &[Y], options: &HistOptions) -> Result<()> {
        self.call(Op::Hist)
            .arg(y)?
            .kwarg("bins", &options.bins)?
            .kwarg("color", options.color.as_str())?
            .kwarg("alpha", &options.alpha)?
            .kwarg("cumulative", &options.cumulative)?
            .invoke()?;
        Ok(())
    }

    pub fn bar<X, Y>(&self, x: &[X], y: &[Y], style: &BarStyle, keywords: &Keywords) -> Result<()>
    where
        X: ToForeign,
        Y: ToForeign,
    {
        check_len("bar", "y", x.len(), y.len())?;
        self.call(Op::Bar)
            .arg(x)?
            .arg(y)?
            .keywords(keywords)?
            .kwarg("ec", style.edge_color.as_str())?
            .kwarg("ls", style.line_style.as_str())?
            .kwarg("lw", &style.line_width)?
            .invoke()?;
        Ok(())
    }

    /// `alpha` is sent as a float
    pub fn fill_between<X, Y1, Y2>(&self, x: &[X], y1: &[Y1], y2: &[Y2], keywords: &Keywords) -> Result<()>
    where
        X: ToForeign,
        Y1: ToForeign,
        Y2: ToForeign,
    {
        check_len("fill_between", "y1", x.len(), y1.len())?;
        check_len("fill_between", "y2", x.len(), y2.len())?;
        self.call(Op::FillBetween)
            .arg(x)?
            .arg(y1)?
            .arg(y2)?
            .keywords(keywords)?
            .invoke()?;
        Ok(())
    }

    /// Arrow from `(x, y)` to `(x + dx, y + dy)`
    pub fn arrow(&self, x: f64, y: f64, dx: f64, dy: f64, keywords: &Keywords) -> Result<()> {
        self.call(Op::Arrow)
            .arg(&x)?
            .arg(&y)?
            .arg(&dx)?
            .arg(&dy)?
            .keywords(keywords)?
            .invoke()?;
        Ok(())
    }

    pub fn errorbar<X, Y, E>(&self, x: &[X], y: &[Y], yerr: &[E], keywords: &Keywords) -> Result<()>
    where
        X: ToForeign,
        Y: ToForeign,
        E: ToForeign,
    {
        check_len("errorbar", "y", x.len(), y.len())?;
        check_len("errorbar", "yerr", x.len(), yerr.len())?;
        self.call(Op::Errorbar)
            .arg(x)?
            .arg(y)?
            .keywords(keywords)?
            .kwarg("yerr", yerr)?
            .invoke()?;
        Ok(())
    }

    /// Contour of a grid, drawn with the `coolwarm` colormap
    pub fn contour<X, Y, Z>(&self, x: &[Vec<X>], y: &[Vec<Y>], z: &[Vec<Z>], keywords: &Keywords) -> Result<()>
    where
        X: ToForeign,
        Y: ToForeign,
        Z: ToForeign,
    {
        check_len("contour", "y", x.len(), y.len())?;
        check_len("contour", "z", x.len(), z.len())?;
        for ((xs, ys), zs) in x.iter().zip(y).zip(z) {
            check_len("contour", "y", xs.len(), ys.len())?;
            check_len("contour", "z", xs.len(), zs.len())?;
        }
        let coolwarm = self.session.module(Module::Cm)?.attr("coolwarm")?;
        self.call(Op::Contour)
            .arg(x)?
            .arg(y)?
            .arg(z)?
            .keywords(keywords)?
            .kwarg_object("cmap", coolwarm.borrow())?
            .invoke()?;
        Ok(())
    }

    /// One box per row; `labels`, when given, name each row
    pub fn boxplot<T: ToForeign>(&self, data: &[Vec<T>], labels: &[&str], keywords: &Keywords) -> Result<()> {
        if !labels.is_empty() {
            check_len("boxplot", "labels", data.len(), labels.len())?;
        }
        let mut call = self.call(Op::Boxplot).arg(data)?.keywords(keywords)?;
        if !labels.is_empty() {
            call = call.kwarg("labels", labels)?;
        }
        call.invoke()?;
        Ok(())
    }

    pub fn text(&self, x: f64, y: f64, text: &str) -> Result<()> {
        self.call(Op::Text).arg(&x)?.arg(&y)?.arg(text)?.invoke()?;
        Ok(())
    }

    /// Annotation at `xy = (x, y)`
    pub fn annotate(&self, text: &str, x: f64, y: f64) -> Result<()> {
        self.call(Op::Annotate).arg(text)?.kwarg("xy", &(x, y))?.invoke()?;
        Ok(())
    }

    pub fn title(&self, title: &str, keywords: &Keywords) -> Result<()> {
        self.labelled(Op::Title, title, keywords)
    }

    pub fn suptitle(&self, title: &str, keywords: &Keywords) -> Result<()> {
        self.labelled(Op::Suptitle, title, keywords)
    }

    pub fn xlabel(&self, label: &str, keywords: &Keywords) -> Result<()> {
        self.labelled(Op::Xlabel, label, keywords)
    }

    pub fn ylabel(&self, label: &str, keywords: &Keywords) -> Result<()> {
        self.labelled(Op::Ylabel, label, keywords)
    }

    fn labelled(&self, op: Op, text: &str, keywords: &Keywords) -> Result<()> {
        self.call(op).arg(text)?.keywords(keywords)?.invoke()?;
        Ok(())
    }

    pub fn legend(&self, keywords: &Keywords) -> Result<()> {
        self.call(Op::Legend).keywords(keywords)?.invoke()?;
        Ok(())
    }

    pub fn grid(&self, visible: bool) -> Result<()> {
        self.call(Op::Grid).arg(&visible)?.invoke()?;
        Ok(())
    }

    pub fn axhline(&self, y: f64, xmin: f64, xmax: f64, keywords: &Keywords) -> Result<()> {
        self.line(Op::Axhline, [y, xmin, xmax], keywords)
    }

    pub fn axvline(&self, x: f64, ymin: f64, ymax: f64, keywords: &Keywords) -> Result<()> {
        self.line(Op::Axvline, [x, ymin, ymax], keywords)
    }

    fn line(&self, op: Op, [at, from, to]: [f64; 3], keywords: &Keywords) -> Result<()> {
        self.call(op)
            .arg(&at)?
            .arg(&from)?
            .arg(&to)?
            .keywords(keywords)?
            .invoke()?;
        Ok(())
    }

    /// Vertical span; `linewidth` and `alpha` are sent as floats
    pub fn axvspan(&self, xmin: f64, xmax: f64, ymin: f64, ymax: f64, keywords: &Keywords) -> Result<()> {
        self.call(Op::Axvspan)
            .arg(&xmin)?
            .arg(&xmax)?
            .arg(&ymin)?
            .arg(&ymax)?
            .keywords(keywords)?
            .invoke()?;
        Ok(())
    }

    /// Limits travel as one `[left, right]` list
    pub fn xlim(&self, left: f64, right: f64) -> Result<()> {
        self.call(Op::Xlim).arg(&[left, right])?.invoke()?;
        Ok(())
    }

    pub fn ylim(&self, bottom: f64, top: f64) -> Result<()> {
        self.call(Op::Ylim).arg(&[bottom, top])?.invoke()?;
        Ok(())
    }

    /// Current x limits of the active axes
    pub fn xlim_bounds(&self) -> Result<(f64, f64)> {
        self.call(Op::Xlim).invoke()?.borrow().extract()
    }

    pub fn ylim_bounds(&self) -> Result<(f64, f64)> {
        self.call(Op::Ylim).invoke()?.borrow().extract()
    }

    /// Labels are optional; when given there must be one per tick
    pub fn xticks<T: ToForeign>(&self, ticks: &[T], labels: &[&str], keywords: &Keywords) -> Result<()> {
        self.ticks(Op::Xticks, "xticks", ticks, labels, keywords)
    }

    pub fn yticks<T: ToForeign>(&self, ticks: &[T], labels: &[&str], keywords: &Keywords) -> Result<()> {
        self.ticks(Op::Yticks, "yticks", ticks, labels, keywords)
    }

    fn ticks<T: ToForeign>(
        &self,
        op: Op,
        operation: &'static str,
        ticks: &[T],
        labels: &[&str],
        keywords: &Keywords,
    ) -> Result<()> {
        if !labels.is_empty() {
            check_len(operation, "labels", ticks.len(), labels.len())?;
        }
        let mut call = self.call(op).arg(ticks)?;
        if !labels.is_empty() {
            call = call.arg(labels)?;
        }
        call.keywords(keywords)?.invoke()?;
        Ok(())
    }

    /// Make subplot `index` (1-based) of an `nrows x ncols` grid current
    pub fn subplot(&self, nrows: i64, ncols: i64, index: i64) -> Result<()> {
        self.call(Op::Subplot).arg(&nrows)?.arg(&ncols)?.arg(&index)?.invoke()?;
        Ok(())
    }

    /// New figure with an `nrows x ncols` grid of axes
    pub fn subplots(
        &self,
        nrows: usize,
        ncols: usize,
        figsize: Option<(i64, i64)>,
        keywords: &Keywords,
    ) -> Result<(Figure<'s>, Axes<'s>)> {
        let mut call = self.call(Op::Subplots).arg(&nrows)?.arg(&ncols)?.keywords(keywords)?;
        if let Some(figsize) = figsize {
            call = call.kwarg("figsize", &figsize)?;
        }
        let pair = call.invoke()?;
        let figure = pair.borrow().item(0)?;
        let axes = pair.borrow().item(1)?;
        Ok((
            Figure::new(self.session, figure),
            Axes::with_layout(self.session, axes, nrows, ncols),
        ))
    }

    /// Activate figure `number`, or a new one; returns its number
    pub fn figure(&self, number: Option<i64>) -> Result<i64> {
        let mut call = self.call(Op::Figure);
        if let Some(number) = number {
            call = call.arg(&number)?;
        }
        Figure::new(self.session, call.invoke()?).number()
    }

    pub fn fignum_exists(&self, number: i64) -> Result<bool> {
        self.call(Op::FignumExists).arg(&number)?.invoke()?.borrow().extract()
    }

    /// The current axes
    pub fn gca(&self, keywords: &Keywords) -> Result<Axes<'s>> {
        let handle = self.call(Op::Gca).keywords(keywords)?.invoke()?;
        Ok(Axes::single(self.session, handle))
    }

    /// The current figure
    pub fn gcf(&self) -> Result<Figure<'s>> {
        let handle = self.call(Op::Gcf).invoke()?;
        Ok(Figure::new(self.session, handle))
    }

    /// Twin axes sharing x with `axes`, or with the current axes
    pub fn twinx(&self, axes: Option<&Axes<'s>>) -> Result<Axes<'s>> {
        self.twin(Op::Twinx, axes)
    }

    pub fn twiny(&self, axes: Option<&Axes<'s>>) -> Result<Axes<'s>> {
        self.twin(Op::Twiny, axes)
    }

    fn twin(&self, op: Op, axes: Option<&Axes<'s>>) -> Result<Axes<'s>> {
        let mut call = self.call(op);
        if let Some(axes) = axes {
            call = call.arg_object(axes.handle());
        }
        Ok(Axes::single(self.session, call.invoke()?))
    }

    /// `rcParams.update(**keywords)`; `text.usetex` is sent as an integer
    pub fn rcparams(&self, keywords: &Keywords) -> Result<()> {
        let pyplot = self.session.module(Module::Pyplot)?;
        let params = pyplot.attr(Op::RcParams.callable())?;
        self.call(Op::RcParamsUpdate)
            .keywords(keywords)?
            .invoke_on(params.borrow())?;
        Ok(())
    }

    pub fn subplots_adjust(&self, spacing: &BTreeMap<String, f64>) -> Result<()> {
        let mut call = self.call(Op::SubplotsAdjust);
        for (key, value) in spacing {
            call = call.kwarg(key, value)?;
        }
        call.invoke()?;
        Ok(())
    }

    pub fn savefig(&self, filename: &str, options: &SaveOptions) -> Result<()> {
        let call = self.call(Op::Savefig).arg(filename)?;
        options.apply(call)?.invoke()?;
        Ok(())
    }

    /// Non-blocking shows pass `block=False`
    pub fn show(&self, block: bool) -> Result<()> {
        let mut call = self.call(Op::Show);
        if !block {
            call = call.kwarg("block", &false)?;
        }
        call.invoke()?;
        Ok(())
    }

    /// Close the current figure
    pub fn close(&self) -> Result<()> {
        self.call(Op::Close).invoke()?;
        Ok(())
    }

    pub fn clf(&self) -> Result<()> {
        self.call(Op::Clf).invoke()?;
        Ok(())
    }

    pub fn pause(&self, interval: f64) -> Result<()> {
        self.call(Op::Pause).arg(&interval)?.invoke()?;
        Ok(())
    }

    pub fn tight_layout(&self) -> Result<()> {
        self.call(Op::TightLayout).invoke()?;
        Ok(())
    }

    /// Wait for `clicks` mouse clicks and return their coordinates
    pub fn ginput(&self, clicks: i64, keywords: &Keywords) -> Result<Vec<[f64; 2]>> {
        self.call(Op::Ginput)
            .arg(&clicks)?
            .keywords(keywords)?
            .invoke()?
            .borrow()
            .extract()
    }
}
