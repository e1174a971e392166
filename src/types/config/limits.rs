//! Connection limit configuration types

use std::num::NonZeroUsize;

nonzero_newtype! {
    /// Number of connection slots the scheduler opens to one server
    ///
    /// # Examples
    /// ```
    /// use nntp_conn::types::ConnectionCount;
    ///
    /// let count = ConnectionCount::new(8).unwrap();
    /// assert_eq!(count.get(), 8);
    /// assert!(ConnectionCount::new(0).is_none());
    /// ```
    #[doc(alias = "slots")]
    pub struct ConnectionCount(NonZeroUsize: usize, serialize as serialize_u64);
}

impl ConnectionCount {
    /// Default number of connections per server
    pub const DEFAULT: Self = Self(NonZeroUsize::new(8).unwrap());
}

impl Default for ConnectionCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}
