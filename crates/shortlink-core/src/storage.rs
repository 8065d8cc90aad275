use crate::error::Result;
use crate::link::{ClickStats, Link};

/// A read-only view of a storage backend.
///
/// All operations block the calling thread until the backend answers.
/// Returned values are owned copies; mutating them never touches storage.
pub trait ReadStorage: Send + Sync + 'static {
    /// Returns every stored link, in no particular order.
    fn load_all(&self) -> Result<Vec<Link>>;

    /// Returns the link whose key equals `normalize(short)`.
    ///
    /// Returns [`StorageError::NotFound`](crate::StorageError::NotFound)
    /// when no such link exists.
    fn load(&self, short: &str) -> Result<Link>;

    /// Returns the total clicks recorded per link, keyed by the link's
    /// current display name.
    ///
    /// Totals recorded for keys that no longer have a link are left out.
    fn load_stats(&self) -> Result<ClickStats>;
}

/// A storage backend for links and click stats.
pub trait Storage: ReadStorage {
    /// Inserts `link`, or replaces every field of the link stored under
    /// the same key.
    fn save(&self, link: &Link) -> Result<()>;

    /// Adds `deltas` to the click totals.
    ///
    /// Each entry is the number of clicks seen since the previous call, so
    /// repeated calls accumulate. Either every delta is recorded or none is.
    fn save_stats(&self, deltas: &ClickStats) -> Result<()>;
}

impl<S: ReadStorage + ?Sized> ReadStorage for Box<S> {
    fn load_all(&self) -> Result<Vec<Link>> {
        (**self).load_all()
    }

    fn load(&self, short: &str) -> Result<Link> {
        (**self).load(short)
    }

    fn load_stats(&self) -> Result<ClickStats> {
        (**self).load_stats()
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn save(&self, link: &Link) -> Result<()> {
        (**self).save(link)
    }

    fn save_stats(&self, deltas: &ClickStats) -> Result<()> {
        (**self).save_stats(deltas)
    }
}
