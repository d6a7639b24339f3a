//! Constants shared by all the tracker delivery layers.

/// Number of peers an announce response carries when the client does not ask
/// for a specific amount.
pub const DEFAULT_NUMWANT: usize = 50;

/// Hard cap applied to the `numwant` request parameter.
pub const MAX_NUMWANT: usize = 100;
