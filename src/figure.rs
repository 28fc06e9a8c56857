use crate::invoke::OpCall;
use crate::ops::Op;
use plotbridge_runtime::{Borrowed, Owned, Result, Session};

/// Options for `savefig`; `dpi` defaults to 100
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub dpi: Option<i64>,
    pub format: Option<String>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            dpi: Some(100),
            format: None,
        }
    }
}

impl SaveOptions {
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub(crate) fn apply<'s>(&self, mut call: OpCall<'s>) -> Result<OpCall<'s>> {
        if let Some(dpi) = self.dpi.filter(|dpi| *dpi > 0) {
            call = call.kwarg("dpi", &dpi)?;
        }
        if let Some(format) = self.format.as_deref().filter(|format| !format.is_empty()) {
            call = call.kwarg("format", format)?;
        }
        Ok(call)
    }
}

/// A figure object
pub struct Figure<'s> {
    session: &'s Session<'s>,
    handle: Owned<'s>,
}

impl<'s> Figure<'s> {
    pub(crate) fn new(session: &'s Session<'s>, handle: Owned<'s>) -> Self {
        Self { session, handle }
    }

    #[inline]
    pub fn handle(&self) -> Borrowed<'_, 's> {
        self.handle.borrow()
    }

    /// The figure's `number` attribute
    pub fn number(&self) -> Result<i64> {
        self.handle.borrow().attr("number")?.borrow().extract()
    }

    pub fn savefig(&self, filename: &str, options: &SaveOptions) -> Result<()> {
        let call = OpCall::new(self.session, Op::Savefig).arg(filename)?;
        options.apply(call)?.invoke_on(self.handle())?;
        Ok(())
    }
}

impl std::fmt::Debug for Figure<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Figure").field("handle", &self.handle).finish()
    }
}
