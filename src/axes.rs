//! A set of axes: methods called on an axes object instead of `pyplot`

use crate::invoke::{check_len, OpCall};
use crate::ops::Op;
use plotbridge_runtime::{Borrowed, Error, Keywords, Owned, Result, Session, ToForeign};

/// One axes object, or the grid `subplots` returns
///
/// A grid is addressed with [`Axes::at`]; the drawing methods apply to a
/// single axes.
pub struct Axes<'s> {
    session: &'s Session<'s>,
    handle: Owned<'s>,
    rows: usize,
    cols: usize,
}

impl<'s> Axes<'s> {
    pub(crate) fn single(session: &'s Session<'s>, handle: Owned<'s>) -> Self {
        Self::with_layout(session, handle, 1, 1)
    }

    pub(crate) fn with_layout(session: &'s Session<'s>, handle: Owned<'s>, rows: usize, cols: usize) -> Self {
        Self {
            session,
            handle,
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }

    #[inline]
    pub fn handle(&self) -> Borrowed<'_, 's> {
        self.handle.borrow()
    }

    /// `(rows, cols)` of the grid; `(1, 1)` for a single axes
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`-th axes of the grid in row-major order
    pub fn at(&self, index: usize) -> Result<Axes<'s>> {
        if index >= self.len() {
            return Err(Error::ArgumentShapeMismatch {
                operation: "at",
                argument: "index",
                expected: self.len(),
                found: index,
            });
        }
        if self.len() == 1 {
            return Ok(Axes::single(self.session, self.handle.clone()));
        }
        let handle = if self.rows == 1 || self.cols == 1 {
            self.handle.borrow().item(index)?
        } else {
            let row = self.handle.borrow().item(index / self.cols)?;
            let cell = row.borrow().item(index % self.cols)?;
            cell
        };
        Ok(Axes::single(self.session, handle))
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
            .invoke_on(self.handle())?;
        Ok(())
    }

    /// Plot `y` against its indices
    pub fn plot_y<Y: ToForeign>(&self, y: &[Y], format: &str, keywords: &Keywords) -> Result<()> {
        let x: Vec<usize> = (0..y.len()).collect();
        self.plot(&x, y, format, keywords)
    }

    pub fn grid(&self, visible: bool, which: &str, axis: &str, keywords: &Keywords) -> Result<()> {
        self.call(Op::Grid)
            .arg(&visible)?
            .arg(which)?
            .arg(axis)?
            .keywords(keywords)?
            .invoke_on(self.handle())?;
        Ok(())
    }

    /// Limits travel as one `(left, right)` tuple
    pub fn set_xlim(&self, left: f64, right: f64) -> Result<()> {
        self.call(Op::SetXlim).arg(&(left, right))?.invoke_on(self.handle())?;
        Ok(())
    }

    pub fn set_ylim(&self, bottom: f64, top: f64) -> Result<()> {
        self.call(Op::SetYlim).arg(&(bottom, top))?.invoke_on(self.handle())?;
        Ok(())
    }

    pub fn set_xlabel(&self, label: &str, keywords: &Keywords) -> Result<()> {
        self.labelled(Op::SetXlabel, label, keywords)
    }

    pub fn set_ylabel(&self, label: &str, keywords: &Keywords) -> Result<()> {
        self.labelled(Op::SetYlabel, label, keywords)
    }

    pub fn set_title(&self, title: &str, keywords: &Keywords) -> Result<()> {
        self.labelled(Op::SetTitle, title, keywords)
    }

    fn labelled(&self, op: Op, text: &str, keywords: &Keywords) -> Result<()> {
        self.call(op).arg(text)?.keywords(keywords)?.invoke_on(self.handle())?;
        Ok(())
    }

    /// Labels are optional; when given there must be one per tick
    pub fn set_xticks<T: ToForeign>(&self, ticks: &[T], labels: &[&str], keywords: &Keywords) -> Result<()> {
        self.ticks(Op::SetXticks, "set_xticks", ticks, labels, keywords)
    }

    pub fn set_yticks<T: ToForeign>(&self, ticks: &[T], labels: &[&str], keywords: &Keywords) -> Result<()> {
        self.ticks(Op::SetYticks, "set_yticks", ticks, labels, keywords)
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
        call.keywords(keywords)?.invoke_on(self.handle())?;
        Ok(())
    }

    /// Horizontal line at `y` spanning `xmin..xmax` in axes coordinates
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
            .invoke_on(self.handle())?;
        Ok(())
    }

    pub fn legend(&self, keywords: &Keywords) -> Result<()> {
        self.call(Op::Legend).keywords(keywords)?.invoke_on(self.handle())?;
        Ok(())
    }

    /// New axes sharing this one's x axis
    pub fn twinx(&self) -> Result<Axes<'s>> {
        let handle = self.call(Op::Twinx).invoke_on(self.handle())?;
        Ok(Axes::single(self.session, handle))
    }

    pub fn cla(&self) -> Result<()> {
        self.call(Op::Cla).invoke_on(self.handle())?;
        Ok(())
    }
}

impl std::fmt::Debug for Axes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Axes")
            .field("handle", &self.handle)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}
