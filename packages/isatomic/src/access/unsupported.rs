use super::StrategyVisitor;
use crate::{Error, Mode, Result};

#[cfg_attr(test, mutants::skip)] // Nothing to mutate, there is only one outcome.
pub(super) fn with_strategy<V: StrategyVisitor>(mode: Mode, _visitor: V) -> Result<V::Output> {
    Err(Error::UnsupportedMode { mode })
}
