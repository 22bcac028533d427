//! Migration history: an immutable, validated dependency graph
//!
//! Built once at startup from the full list of migrations. Construction
//! rejects duplicates, unknown or self dependencies, and cycles, so every
//! accessor can assume a well-formed DAG.
//!
//! All orderings are deterministic: ties are broken by `(app, name)`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::errors::{MigrationError, MigrationResult};
use super::types::{Migration, MigrationId};

#[derive(Debug, Clone)]
pub struct MigrationHistory {
    migrations: BTreeMap<MigrationId, Migration>,
    /// Reverse edges: migration -> migrations that depend on it
    dependents: BTreeMap<MigrationId, BTreeSet<MigrationId>>,
}

impl MigrationHistory {
    /// Validates and indexes the migrations.
    pub fn new(migrations: Vec<Migration>) -> MigrationResult<Self> {
        let mut by_id = BTreeMap::new();
        for migration in migrations {
            if by_id.contains_key(&migration.id) {
                return Err(MigrationError::duplicate(&migration.id));
            }
            by_id.insert(migration.id.clone(), migration);
        }

        let mut dependents: BTreeMap<MigrationId, BTreeSet<MigrationId>> =
            by_id.keys().map(|id| (id.clone(), BTreeSet::new())).collect();

        for migration in by_id.values() {
            for dep in &migration.dependencies {
                if dep == &migration.id {
                    return Err(MigrationError::self_dependency(&migration.id));
                }
                match dependents.get_mut(dep) {
                    Some(set) => {
                        set.insert(migration.id.clone());
                    }
                    None => return Err(MigrationError::unknown_dependency(&migration.id, dep)),
                }
            }
        }

        let history = Self {
            migrations: by_id,
            dependents,
        };
        history.check_acyclic()?;
        Ok(history)
    }

    /// Depth-first search with colouring; reports the first cycle found.
    fn check_acyclic(&self) -> MigrationResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            history: &'a MigrationHistory,
            id: &'a MigrationId,
            marks: &mut HashMap<&'a MigrationId, Mark>,
            stack: &mut Vec<&'a MigrationId>,
        ) -> MigrationResult<()> {
            match marks.get(id) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = stack.iter().position(|s| *s == id).unwrap_or(0);
                    let mut cycle: Vec<MigrationId> =
                        stack[start..].iter().map(|s| (*s).clone()).collect();
                    cycle.push(id.clone());
                    return Err(MigrationError::circular(&cycle));
                }
                None => {}
            }

            marks.insert(id, Mark::Visiting);
            stack.push(id);
            if let Some(migration) = history.migrations.get(id) {
                for dep in &migration.dependencies {
                    visit(history, dep, marks, stack)?;
                }
            }
            stack.pop();
            marks.insert(id, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        let mut stack = Vec::new();
        for id in self.migrations.keys() {
            visit(self, id, &mut marks, &mut stack)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &MigrationId) -> Option<&Migration> {
        self.migrations.get(id)
    }

    /// Gets a migration, failing with `DELTA_UNKNOWN_MIGRATION`.
    pub fn require(&self, id: &MigrationId) -> MigrationResult<&Migration> {
        self.migrations
            .get(id)
            .ok_or_else(|| MigrationError::unknown_migration(id))
    }

    pub fn contains(&self, id: &MigrationId) -> bool {
        self.migrations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Distinct app labels, sorted
    pub fn apps(&self) -> Vec<&str> {
        let apps: BTreeSet<&str> = self.migrations.keys().map(|id| id.app.as_str()).collect();
        apps.into_iter().collect()
    }

    pub fn has_app(&self, app: &str) -> bool {
        self.migrations.keys().any(|id| id.app == app)
    }

    /// Migrations of one app in name order
    pub fn app_migrations<'a>(&'a self, app: &'a str) -> impl Iterator<Item = &'a Migration> + 'a {
        self.migrations.values().filter(move |m| m.id.app == app)
    }

    /// Direct dependents of a migration
    pub fn dependents_of(&self, id: &MigrationId) -> impl Iterator<Item = &MigrationId> {
        self.dependents.get(id).into_iter().flatten()
    }

    /// Every migration, dependencies before dependents.
    ///
    /// Kahn's algorithm over a sorted ready set, so equal inputs always give
    /// the same order.
    pub fn topological_order(&self) -> Vec<&MigrationId> {
        let mut remaining: BTreeMap<&MigrationId, usize> = self
            .migrations
            .values()
            .map(|m| (&m.id, m.dependencies.iter().collect::<BTreeSet<_>>().len()))
            .collect();
        let mut ready: BTreeSet<&MigrationId> = remaining
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.migrations.len());

        while let Some(id) = ready.pop_first() {
            remaining.remove(id);
            order.push(id);
            for dependent in self.dependents_of(id) {
                if let Some(n) = remaining.get_mut(dependent) {
                    *n -= 1;
                    if *n == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        order
    }

    /// `target` and all of its ancestors, dependencies first.
    pub fn forwards_plan(&self, target: &MigrationId) -> MigrationResult<Vec<&MigrationId>> {
        let start = &self.require(target)?.id;
        let closure = self.closure(start, |m| {
            self.migrations
                .get(m)
                .map(|mig| mig.dependencies.iter().collect())
                .unwrap_or_default()
        });
        Ok(self
            .topological_order()
            .into_iter()
            .filter(|id| closure.contains(id))
            .collect())
    }

    /// `target` and all of its descendants, dependents first.
    pub fn backwards_plan(&self, target: &MigrationId) -> MigrationResult<Vec<&MigrationId>> {
        let start = &self.require(target)?.id;
        let closure = self.closure(start, |m| self.dependents_of(m).collect());
        let mut order: Vec<&MigrationId> = self
            .topological_order()
            .into_iter()
            .filter(|id| closure.contains(id))
            .collect();
        order.reverse();
        Ok(order)
    }

    /// Migrations of `app` that no other migration of the same app depends on
    pub fn leaf_nodes(&self, app: &str) -> Vec<&MigrationId> {
        self.migrations
            .values()
            .filter(|m| m.id.app == app)
            .map(|m| &m.id)
            .filter(|id| !self.dependents_of(id).any(|d| d.app == app))
            .collect()
    }

    fn closure<'a, F>(&'a self, start: &'a MigrationId, next: F) -> BTreeSet<&'a MigrationId>
    where
        F: Fn(&'a MigrationId) -> Vec<&'a MigrationId>,
    {
        let mut seen = BTreeSet::new();
        let mut queue = vec![start];
        while let Some(id) = queue.pop() {
            if seen.insert(id) {
                queue.extend(next(id));
            }
        }
        seen
    }
}
