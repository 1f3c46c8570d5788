use std::collections::HashMap;

/// Implicit group holding every connected client.
pub const ALL_CLIENTS: &str = "*";

/// Group registry: `group -> [client_id...]`.
///
/// Membership is a multiset: `add` appends without a duplicate check and
/// `remove` drops only the first matching entry. `prune` drops every entry
/// for a client. Groups are created lazily and never deleted.
#[derive(Debug)]
pub struct GroupRegistry {
    groups: HashMap<String, Vec<String>>,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry {
    pub fn new() -> Self {
        let mut groups = HashMap::new();
        groups.insert(ALL_CLIENTS.to_string(), Vec::new());
        Self { groups }
    }

    pub fn add(&mut self, client_id: &str, group: &str) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .push(client_id.to_string());
    }

    /// Remove the first entry for `client_id`. Returns whether one was found.
    pub fn remove(&mut self, client_id: &str, group: &str) -> bool {
        let Some(members) = self.groups.get_mut(group) else { return false; };
        match members.iter().position(|c| c == client_id) {
            Some(idx) => {
                members.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove every entry for `client_id` in every group.
    pub fn prune(&mut self, client_id: &str) {
        for members in self.groups.values_mut() {
            members.retain(|c| c != client_id);
        }
    }

    /// Raw member list, duplicates included. `None` if the group was never created.
    pub fn members(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// Distinct members in first-join order.
    pub fn distinct_members(&self, group: &str) -> Vec<String> {
        let Some(members) = self.groups.get(group) else { return vec![]; };
        let mut out: Vec<String> = Vec::with_capacity(members.len());
        for m in members {
            if !out.contains(m) {
                out.push(m.clone());
            }
        }
        out
    }

    /// Sorted group names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
