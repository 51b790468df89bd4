use bytes::Bytes;
use tracing::debug;

use super::Session;
use crate::errors::ErrorCode;
use crate::node::Acl;
use crate::node::CreateFlags;
use crate::node::Stat;
use crate::Error;

impl Session {
    /// Optimistic read-modify-write of `path`.
    ///
    /// `change` receives the current value and stat (an empty value and `None`
    /// when the node is absent) and returns the desired value. The node is
    /// created with `flags` and `acl` when absent, left alone when the value is
    /// unchanged, and otherwise written with a version check. Losing a race
    /// (node created concurrently, version moved, node deleted) restarts the
    /// loop; any other failure, including one returned by `change`, aborts it.
    ///
    /// Under the default policy the loop never gives up. A bounded
    /// [`RetryChangePolicy`](crate::RetryChangePolicy) turns exhaustion into
    /// [`Error::RetryExhausted`].
    ///
    /// ```ignore
    /// session.retry_change("/counter", CreateFlags::PERSISTENT, &world_acl(PERM_ALL), |old, _| {
    ///     let n: u64 = std::str::from_utf8(old).ok().and_then(|s| s.parse().ok()).unwrap_or(0);
    ///     Ok::<_, Error>((n + 1).to_string().into_bytes())
    /// })?;
    /// ```
    pub fn retry_change<F, E>(
        &self,
        path: &str,
        flags: CreateFlags,
        acl: &[Acl],
        mut change: F,
    ) -> std::result::Result<(), E>
    where
        F: FnMut(&[u8], Option<&Stat>) -> std::result::Result<Vec<u8>, E>,
        E: From<Error>,
    {
        let mut attempts = 0usize;
        loop {
            attempts += 1;

            let (old_value, old_stat) = match self.get(path) {
                Ok((data, stat)) => (data, Some(stat)),
                Err(e) if e.is_no_node() => (Bytes::new(), None),
                Err(e) => return Err(e.into()),
            };

            let new_value = change(&old_value, old_stat.as_ref())?;

            let conflict = match old_stat {
                None => match self.create(path, &new_value, flags, acl) {
                    Ok(_) => return Ok(()),
                    Err(e) if e == ErrorCode::NodeExists => e,
                    Err(e) => return Err(e.into()),
                },
                Some(_) if new_value[..] == old_value[..] => return Ok(()),
                Some(stat) => match self.set(path, &new_value, stat.version) {
                    Ok(_) => return Ok(()),
                    Err(e) if e == ErrorCode::BadVersion || e == ErrorCode::NoNode => e,
                    Err(e) => return Err(e.into()),
                },
            };

            let policy = self.retry_policy;
            if policy.is_bounded() && attempts > policy.max_retries {
                return Err(Error::RetryExhausted {
                    path: path.to_string(),
                    attempts,
                }
                .into());
            }
            debug!(path, attempts, %conflict, "retry_change lost a race; restarting");

            let delay = policy.delay(attempts - 1);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }
}
