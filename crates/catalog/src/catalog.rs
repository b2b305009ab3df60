//! The authoritative collection catalog
//!
//! Maps ids and namespaces to collections and holds view definitions.
//! Exactly one collection may occupy a namespace at any instant. All
//! mutations go through [`UnitOfWork`](crate::txn::UnitOfWork); the catalog
//! itself only exposes reads and the unique-name generator.

use crate::collection::{Collection, CollectionMeta, ViewDefinition};
use crate::txn::UnitOfWork;
use coral_core::collection::{CollectionOptions, Record};
use coral_core::error::{Error, Result};
use coral_core::types::{CollectionId, DatabaseName, Namespace, RecordId};
use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

/// Attempts made to find an unused generated collection name.
const UNIQUE_NAME_ATTEMPTS: usize = 100;

pub(crate) struct CatalogInner {
    /// Monotonic commit version; bumped once per committed unit of work.
    pub(crate) version: u64,
    pub(crate) databases: BTreeSet<DatabaseName>,
    pub(crate) by_namespace: BTreeMap<Namespace, CollectionId>,
    pub(crate) collections: HashMap<CollectionId, Collection>,
    pub(crate) views: BTreeMap<Namespace, ViewDefinition>,
}

impl CatalogInner {
    pub(crate) fn occupant(&self, ns: &Namespace) -> Option<CollectionId> {
        self.by_namespace.get(ns).copied()
    }
}

/// Authoritative registry mapping ids and namespaces to collections.
pub struct Catalog {
    pub(crate) inner: RwLock<CatalogInner>,
}

impl Catalog {
    /// Create an empty catalog.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Catalog {
            inner: RwLock::new(CatalogInner {
                version: 0,
                databases: BTreeSet::new(),
                by_namespace: BTreeMap::new(),
                collections: HashMap::new(),
                views: BTreeMap::new(),
            }),
        }
    }

    /// Open a unit of work against the current catalog state.
    pub fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self, self.inner.read().version)
    }

    /// Current commit version.
    pub fn current_version(&self) -> u64 {
        self.inner.read().version
    }

    /// Id of the collection occupying `ns`, if any.
    pub fn lookup_by_namespace(&self, ns: &Namespace) -> Option<CollectionId> {
        self.inner.read().occupant(ns)
    }

    /// Current namespace of the collection with `id`, if it still exists.
    pub fn namespace_of_id(&self, id: CollectionId) -> Option<Namespace> {
        self.inner
            .read()
            .collections
            .get(&id)
            .map(|c| c.namespace.clone())
    }

    /// Metadata snapshot of the collection occupying `ns`.
    pub fn collection_meta(&self, ns: &Namespace) -> Option<CollectionMeta> {
        let inner = self.inner.read();
        let id = inner.occupant(ns)?;
        inner.collections.get(&id).map(CollectionMeta::of)
    }

    /// Metadata snapshot of the collection with `id`.
    pub fn meta_of_id(&self, id: CollectionId) -> Option<CollectionMeta> {
        self.inner.read().collections.get(&id).map(CollectionMeta::of)
    }

    /// Creation options of the collection with `id`.
    pub fn options_of(&self, id: CollectionId) -> Option<CollectionOptions> {
        self.inner
            .read()
            .collections
            .get(&id)
            .map(|c| c.options.clone())
    }

    /// Whether the database exists (explicitly created or holding data).
    pub fn database_exists(&self, db: &DatabaseName) -> bool {
        self.inner.read().databases.contains(db)
    }

    /// Create the database entry if absent. Databases come into being
    /// implicitly with their first collection.
    pub fn ensure_database(&self, db: &DatabaseName) {
        self.inner.write().databases.insert(db.clone());
    }

    /// Namespaces of all collections in `db`, in name order.
    pub fn collections_in(&self, db: &DatabaseName) -> Vec<Namespace> {
        self.inner
            .read()
            .by_namespace
            .keys()
            .filter(|ns| &ns.db == db)
            .cloned()
            .collect()
    }

    /// The view defined at `ns`, if any.
    pub fn lookup_view(&self, ns: &Namespace) -> Option<ViewDefinition> {
        self.inner.read().views.get(ns).cloned()
    }

    /// Define a view at `ns`.
    ///
    /// # Errors
    /// `NamespaceExists` if a collection or view already occupies `ns`.
    pub fn define_view(&self, ns: Namespace, def: ViewDefinition) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.occupant(&ns).is_some() || inner.views.contains_key(&ns) {
            return Err(Error::NamespaceExists(ns.ns()));
        }
        inner.databases.insert(ns.db.clone());
        inner.views.insert(ns, def);
        Ok(())
    }

    /// Generate an unused collection name in `db` of the form
    /// `tmp<5 alphanumerics>.rename`.
    ///
    /// The result is only guaranteed to stay unused while the caller holds
    /// the database exclusively locked.
    ///
    /// # Errors
    /// `NamespaceExists` if no unused name was found after a bounded number
    /// of attempts.
    pub fn generate_unique_namespace(&self, db: &DatabaseName) -> Result<Namespace> {
        let inner = self.inner.read();
        let mut rng = rand::thread_rng();
        for _ in 0..UNIQUE_NAME_ATTEMPTS {
            let salt: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(5)
                .map(char::from)
                .collect();
            let ns = Namespace::new(db.clone(), format!("tmp{salt}.rename"));
            if inner.occupant(&ns).is_none() && !inner.views.contains_key(&ns) {
                return Ok(ns);
            }
        }
        Err(Error::NamespaceExists(format!(
            "cannot generate unique temporary collection name in database {db}"
        )))
    }

    /// First record of the collection strictly after `after`, in storage
    /// order; the first record overall when `after` is `None`.
    pub fn next_record_after(
        &self,
        id: CollectionId,
        after: Option<RecordId>,
    ) -> Option<(RecordId, Record)> {
        let inner = self.inner.read();
        let coll = inner.collections.get(&id)?;
        let lower = match after {
            Some(pos) => Bound::Excluded(pos),
            None => Bound::Unbounded,
        };
        coll.records
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(rid, rec)| (*rid, rec.clone()))
    }

    /// The record at exactly `pos`, if present.
    pub fn record_at(&self, id: CollectionId, pos: RecordId) -> Option<Record> {
        self.inner
            .read()
            .collections
            .get(&id)?
            .records
            .get(&pos)
            .cloned()
    }
}
