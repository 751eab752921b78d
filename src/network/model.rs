use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, Utc};

use super::ingest::{ConnectionRecord, OwnerProfile, parse_connected_on};

pub const OWNER_ID: &str = "OWNER";

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub role: String,
    pub company: String,
    pub connected: DateTime<Utc>,
    pub profile_url: Option<String>,
}

impl Node {
    pub fn is_owner(&self) -> bool {
        self.id == OWNER_ID
    }

    pub fn year(&self) -> i32 {
        self.connected.year()
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            self.name.as_str()
        }
    }

    /// `role at company`, or whichever half is present.
    pub fn headline(&self) -> String {
        match (self.role.trim(), self.company.trim()) {
            ("", "") => String::new(),
            (role, "") => role.to_owned(),
            ("", company) => company.to_owned(),
            (role, company) => format!("{role} at {company}"),
        }
    }
}

/// Star edge between two working-view indices. The source is always the owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
}

/// The canonical node population. The owner always sits at index 0 and the
/// list is never reordered or shrunk after construction.
#[derive(Clone, Debug)]
pub struct Network {
    nodes: Vec<Node>,
    index_by_id: HashMap<String, usize>,
    profile: OwnerProfile,
}

impl Network {
    pub fn new(owner_name: &str, profile: OwnerProfile, now: DateTime<Utc>) -> Self {
        let name = if owner_name.trim().is_empty() {
            profile.full_name()
        } else {
            owner_name.trim().to_owned()
        };

        let owner = Node {
            id: OWNER_ID.to_owned(),
            name: if name.is_empty() { "You".to_owned() } else { name },
            role: profile.headline.clone(),
            company: String::new(),
            connected: now,
            profile_url: None,
        };

        let mut index_by_id = HashMap::new();
        index_by_id.insert(owner.id.clone(), 0);

        Self {
            nodes: vec![owner],
            index_by_id,
            profile,
        }
    }

    pub fn from_records(
        records: Vec<ConnectionRecord>,
        owner_name: &str,
        profile: OwnerProfile,
        now: DateTime<Utc>,
    ) -> Self {
        let mut network = Self::new(owner_name, profile, now);
        network.extend(records);
        network
    }

    /// Appends connections in order; ids continue from the current count.
    pub fn extend(&mut self, records: impl IntoIterator<Item = ConnectionRecord>) {
        for record in records {
            let id = format!("p_{}", self.nodes.len() - 1);
            let name = format!("{} {}", record.first_name.trim(), record.last_name.trim())
                .trim()
                .to_owned();
            let profile_url = Some(record.profile_url.trim().to_owned()).filter(|url| !url.is_empty());

            self.index_by_id.insert(id.clone(), self.nodes.len());
            self.nodes.push(Node {
                id,
                name,
                role: record.role.trim().to_owned(),
                company: record.company.trim().to_owned(),
                connected: parse_connected_on(&record.connected_on_raw),
                profile_url,
            });
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn owner(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn connections(&self) -> &[Node] {
        &self.nodes[1..]
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn profile(&self) -> &OwnerProfile {
        &self.profile
    }

    pub fn connection_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn years(&self) -> Vec<i32> {
        self.connections()
            .iter()
            .map(Node::year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
