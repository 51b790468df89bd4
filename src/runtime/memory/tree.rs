use std::collections::BTreeSet;
use std::collections::HashMap;

use bytes::Bytes;

use super::auth::check_acl;
use super::auth::fixup_acl;
use super::auth::AuthId;
use super::path::name_of;
use super::path::parent_of;
use super::path::validate_path;
use crate::constants::ANY_VERSION;
use crate::constants::PERM_ADMIN;
use crate::constants::PERM_ALL;
use crate::constants::PERM_CREATE;
use crate::constants::PERM_DELETE;
use crate::constants::PERM_READ;
use crate::constants::PERM_WRITE;
use crate::constants::SYSTEM_ROOT;
use crate::errors::ErrorCode;
use crate::event::EventType;
use crate::node::world_acl;
use crate::node::Acl;
use crate::node::CreateFlags;
use crate::node::Stat;
use crate::runtime::NativeHandle;
use crate::utils::time::now_millis;
use crate::watch::WatchId;

/// Connection on whose behalf a tree operation runs
pub(super) struct Caller<'a> {
    pub(super) handle: NativeHandle,
    pub(super) session_id: i64,
    pub(super) auth: &'a [AuthId],
}

/// A watch registration triggered by a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Fired {
    pub(super) watch: WatchId,
    pub(super) event_type: EventType,
    pub(super) path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Watcher {
    handle: NativeHandle,
    watch: WatchId,
}

struct Node {
    data: Bytes,
    acl: Vec<Acl>,
    stat: Stat,
    children: BTreeSet<String>,
}

impl Node {
    fn system(children: &[&str]) -> Self {
        Self {
            data: Bytes::new(),
            acl: world_acl(PERM_ALL),
            stat: Stat {
                num_children: children.len() as i32,
                ..Stat::default()
            },
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Versioned node tree with one-shot watch registrations
pub(super) struct DataTree {
    nodes: HashMap<String, Node>,
    /// Armed by `get` and by `exists`, whether or not the node exists
    data_watches: HashMap<String, Vec<Watcher>>,
    child_watches: HashMap<String, Vec<Watcher>>,
    ephemerals: HashMap<i64, BTreeSet<String>>,
    zxid: i64,
}

fn check_version(
    expected: i32,
    actual: i32,
) -> Result<(), ErrorCode> {
    if expected != ANY_VERSION && expected != actual {
        return Err(ErrorCode::BadVersion);
    }
    Ok(())
}

fn fire(
    watches: &mut HashMap<String, Vec<Watcher>>,
    path: &str,
    event_type: EventType,
    fired: &mut Vec<Fired>,
) {
    let Some(watchers) = watches.remove(path) else {
        return;
    };
    fired.extend(watchers.into_iter().map(|w| Fired {
        watch: w.watch,
        event_type,
        path: path.to_string(),
    }));
}

impl DataTree {
    pub(super) fn new() -> Self {
        let quota = format!("{SYSTEM_ROOT}/quota");
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::system(&["zookeeper"]));
        nodes.insert(SYSTEM_ROOT.to_string(), Node::system(&["quota"]));
        nodes.insert(quota, Node::system(&[]));
        Self {
            nodes,
            data_watches: HashMap::new(),
            child_watches: HashMap::new(),
            ephemerals: HashMap::new(),
            zxid: 0,
        }
    }

    fn node(
        &self,
        path: &str,
    ) -> Result<&Node, ErrorCode> {
        self.nodes.get(path).ok_or(ErrorCode::NoNode)
    }

    fn arm(
        watches: &mut HashMap<String, Vec<Watcher>>,
        caller: &Caller<'_>,
        path: &str,
        watch: Option<WatchId>,
    ) {
        if let Some(watch) = watch {
            watches.entry(path.to_string()).or_default().push(Watcher {
                handle: caller.handle,
                watch,
            });
        }
    }

    pub(super) fn get(
        &mut self,
        caller: &Caller<'_>,
        path: &str,
        watch: Option<WatchId>,
    ) -> Result<(Bytes, Stat), ErrorCode> {
        validate_path(path, false)?;
        let node = self.node(path)?;
        if !check_acl(&node.acl, PERM_READ, caller.auth) {
            return Err(ErrorCode::NoAuth);
        }
        let result = (node.data.clone(), node.stat);
        Self::arm(&mut self.data_watches, caller, path, watch);
        Ok(result)
    }

    pub(super) fn children(
        &mut self,
        caller: &Caller<'_>,
        path: &str,
        watch: Option<WatchId>,
    ) -> Result<(Vec<String>, Stat), ErrorCode> {
        validate_path(path, false)?;
        let node = self.node(path)?;
        if !check_acl(&node.acl, PERM_READ, caller.auth) {
            return Err(ErrorCode::NoAuth);
        }
        let result = (node.children.iter().cloned().collect(), node.stat);
        Self::arm(&mut self.child_watches, caller, path, watch);
        Ok(result)
    }

    /// The watch is armed even when the node does not exist
    pub(super) fn exists(
        &mut self,
        caller: &Caller<'_>,
        path: &str,
        watch: Option<WatchId>,
    ) -> Result<Stat, ErrorCode> {
        validate_path(path, false)?;
        Self::arm(&mut self.data_watches, caller, path, watch);
        Ok(self.node(path)?.stat)
    }

    pub(super) fn create(
        &mut self,
        caller: &Caller<'_>,
        path: &str,
        value: &[u8],
        flags: CreateFlags,
        acl: &[Acl],
        fired: &mut Vec<Fired>,
    ) -> Result<String, ErrorCode> {
        validate_path(path, flags.is_sequence())?;
        if path == "/" {
            return Err(ErrorCode::NodeExists);
        }
        let parent_path = parent_of(path).to_string();
        let parent = self.node(&parent_path)?;
        if !check_acl(&parent.acl, PERM_CREATE, caller.auth) {
            return Err(ErrorCode::NoAuth);
        }
        let acl = fixup_acl(acl, caller.auth)?;

        let path = if flags.is_sequence() {
            format!("{path}{:010}", parent.stat.cversion)
        } else {
            path.to_string()
        };
        if self.nodes.contains_key(&path) {
            return Err(ErrorCode::NodeExists);
        }
        if parent.stat.ephemeral_owner != 0 {
            return Err(ErrorCode::NoChildrenForEphemerals);
        }

        self.zxid += 1;
        let zxid = self.zxid;
        let now = now_millis();
        let ephemeral_owner = if flags.is_ephemeral() { caller.session_id } else { 0 };

        if let Some(parent) = self.nodes.get_mut(&parent_path) {
            parent.children.insert(name_of(&path).to_string());
            parent.stat.cversion += 1;
            parent.stat.pzxid = zxid;
            parent.stat.num_children += 1;
        }
        self.nodes.insert(
            path.clone(),
            Node {
                data: Bytes::copy_from_slice(value),
                acl,
                stat: Stat {
                    czxid: zxid,
                    mzxid: zxid,
                    ctime: now,
                    mtime: now,
                    ephemeral_owner,
                    data_length: value.len() as i32,
                    pzxid: zxid,
                    ..Stat::default()
                },
                children: BTreeSet::new(),
            },
        );
        if ephemeral_owner != 0 {
            self.ephemerals.entry(ephemeral_owner).or_default().insert(path.clone());
        }

        fire(&mut self.data_watches, &path, EventType::Created, fired);
        fire(&mut self.child_watches, &parent_path, EventType::Child, fired);
        Ok(path)
    }

    pub(super) fn set(
        &mut self,
        caller: &Caller<'_>,
        path: &str,
        value: &[u8],
        version: i32,
        fired: &mut Vec<Fired>,
    ) -> Result<Stat, ErrorCode> {
        validate_path(path, false)?;
        let zxid = self.zxid + 1;
        let node = self.nodes.get_mut(path).ok_or(ErrorCode::NoNode)?;
        if !check_acl(&node.acl, PERM_WRITE, caller.auth) {
            return Err(ErrorCode::NoAuth);
        }
        check_version(version, node.stat.version)?;

        self.zxid = zxid;
        node.data = Bytes::copy_from_slice(value);
        node.stat.version += 1;
        node.stat.mzxid = zxid;
        node.stat.mtime = now_millis();
        node.stat.data_length = value.len() as i32;
        let stat = node.stat;

        fire(&mut self.data_watches, path, EventType::Changed, fired);
        Ok(stat)
    }

    pub(super) fn delete(
        &mut self,
        caller: &Caller<'_>,
        path: &str,
        version: i32,
        fired: &mut Vec<Fired>,
    ) -> Result<(), ErrorCode> {
        validate_path(path, false)?;
        if path == "/" || path == SYSTEM_ROOT || path.starts_with(&format!("{SYSTEM_ROOT}/")) {
            return Err(ErrorCode::BadArguments);
        }
        let parent_path = parent_of(path).to_string();
        let parent = self.node(&parent_path)?;
        if !check_acl(&parent.acl, PERM_DELETE, caller.auth) {
            return Err(ErrorCode::NoAuth);
        }
        let node = self.node(path)?;
        check_version(version, node.stat.version)?;
        if !node.children.is_empty() {
            return Err(ErrorCode::NotEmpty);
        }
        self.remove_node(path, fired);
        Ok(())
    }

    fn remove_node(
        &mut self,
        path: &str,
        fired: &mut Vec<Fired>,
    ) {
        let Some(node) = self.nodes.remove(path) else {
            return;
        };
        self.zxid += 1;
        let parent_path = parent_of(path).to_string();
        if let Some(parent) = self.nodes.get_mut(&parent_path) {
            parent.children.remove(name_of(path));
            parent.stat.cversion += 1;
            parent.stat.pzxid = self.zxid;
            parent.stat.num_children -= 1;
        }
        let owner = node.stat.ephemeral_owner;
        if owner != 0 {
            if let Some(paths) = self.ephemerals.get_mut(&owner) {
                paths.remove(path);
                if paths.is_empty() {
                    self.ephemerals.remove(&owner);
                }
            }
        }

        fire(&mut self.data_watches, path, EventType::Deleted, fired);
        fire(&mut self.child_watches, path, EventType::Deleted, fired);
        fire(&mut self.child_watches, &parent_path, EventType::Child, fired);
    }

    pub(super) fn get_acl(
        &self,
        path: &str,
    ) -> Result<(Vec<Acl>, Stat), ErrorCode> {
        validate_path(path, false)?;
        let node = self.node(path)?;
        Ok((node.acl.clone(), node.stat))
    }

    pub(super) fn set_acl(
        &mut self,
        caller: &Caller<'_>,
        path: &str,
        acl: &[Acl],
        version: i32,
    ) -> Result<(), ErrorCode> {
        validate_path(path, false)?;
        let node = self.nodes.get_mut(path).ok_or(ErrorCode::NoNode)?;
        if !check_acl(&node.acl, PERM_ADMIN, caller.auth) {
            return Err(ErrorCode::NoAuth);
        }
        let acl = fixup_acl(acl, caller.auth)?;
        check_version(version, node.stat.aversion)?;
        node.acl = acl;
        node.stat.aversion += 1;
        Ok(())
    }

    /// Deletes every ephemeral node owned by `session_id`
    pub(super) fn remove_ephemerals(
        &mut self,
        session_id: i64,
        fired: &mut Vec<Fired>,
    ) {
        let Some(paths) = self.ephemerals.remove(&session_id) else {
            return;
        };
        for path in paths {
            self.remove_node(&path, fired);
        }
    }

    /// Drops every registration armed through `handle`, returning their ids
    pub(super) fn remove_watches(
        &mut self,
        handle: NativeHandle,
    ) -> Vec<WatchId> {
        let mut removed = Vec::new();
        for watches in [&mut self.data_watches, &mut self.child_watches] {
            watches.retain(|_, watchers| {
                watchers.retain(|w| {
                    if w.handle == handle {
                        removed.push(w.watch);
                        return false;
                    }
                    true
                });
                !watchers.is_empty()
            });
        }
        removed.sort();
        removed
    }

    /// Ids of every registration armed through `handle`
    pub(super) fn watches_of(
        &self,
        handle: NativeHandle,
    ) -> Vec<WatchId> {
        let mut ids: Vec<WatchId> = self
            .data_watches
            .values()
            .chain(self.child_watches.values())
            .flatten()
            .filter(|w| w.handle == handle)
            .map(|w| w.watch)
            .collect();
        ids.sort();
        ids
    }
}
