/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! The object repository: save/load/delete for vocabulary items and the
//! membership engine for collections.
//!
//! Storage-root collections (`actors`, `activities`, `objects`) are listed
//! by key-prefix iteration; owned collections (`inbox`, `outbox`, ...) keep
//! an explicit, insertion-ordered, deduplicated IRI list under their
//! `__items` sub-key while the collection object itself lives under
//! `__raw`.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use tracing::{debug, info, warn};

use fedi3_vocab::collections::is_hidden_collection;
use fedi3_vocab::item::{contains_iri, ACTOR_TYPES};
use fedi3_vocab::{
    checks, decode_item, encode_iri_list, encode_item, truncate_to_seconds, Actor, Check,
    Collection, Iri, Item, PUBLIC_NS,
};

use crate::engine::Engine;
use crate::errors::{RepoError, Result};
use crate::lifecycle;
use crate::paths::{
    is_items_key, is_object_key, is_storage_root_inner_key, is_storage_root_key, item_path,
    items_key, iter_key_too_deep, object_key,
};

/// Recursion cap for on-read dereferencing, matching the prefix-iterator
/// depth caps.
const MAX_DEREF_DEPTH: u8 = 2;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Directory for the on-disk store; empty selects the in-memory engine.
    pub path: String,
    /// Enables the read-through item cache.
    pub cache_enable: bool,
}

pub struct Repo {
    pub(crate) engine: Engine,
    path: String,
    cache: Option<Mutex<HashMap<String, Item>>>,
}

impl Repo {
    pub fn new(c: Config) -> Result<Repo> {
        let path = lifecycle::storage_path(&c)?;
        let cache = c.cache_enable.then(|| Mutex::new(HashMap::new()));
        Ok(Repo {
            engine: Engine::new(),
            path,
            cache,
        })
    }

    pub fn open(&mut self) -> Result<()> {
        self.engine.open(&self.path)
    }

    pub fn close(&mut self) -> Result<()> {
        self.cache_clear();
        self.engine.close()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Loads the item at `iri`, resolving references and materializing
    /// collections, then filters through the check chain. A single match
    /// for an item IRI is returned bare; anything else comes back as an
    /// `OrderedCollection` keyed by the originating IRI.
    pub fn load(&self, iri: &Iri, checks: &[Check]) -> Result<Item> {
        if !self.engine.is_open() {
            return Err(RepoError::NotOpen);
        }
        let prefix = item_path(iri);
        if prefix.is_empty() {
            return Err(RepoError::NotFound(iri.to_string()));
        }
        let load_max_one = is_item_iri(iri);
        if load_max_one && checks.is_empty() {
            if let Some(hit) = self.cache_get(iri) {
                return Ok(hit);
            }
        }

        let mut members = self.load_from_path(iri, &prefix, checks, load_max_one)?;
        if load_max_one && members.len() == 1 {
            let it = members.remove(0);
            if checks.is_empty() {
                self.cache_put(&it);
            }
            return Ok(it);
        }

        if let Some(cursor) = checks::after(checks) {
            if let Some(i) = members.iter().position(|it| it.id().equals(cursor, false)) {
                members.drain(..=i);
            }
        }
        if let Some(n) = checks::max_items(checks) {
            members.truncate(n);
        }
        let mut col = Collection::ordered(iri.clone());
        for it in members {
            col.push(it);
        }
        col.total_items = Some(col.members().len() as u64);
        Ok(Item::Collection(Box::new(col)))
    }

    /// Loads exactly one stored item, following bare links.
    pub fn load_one(&self, iri: &Iri) -> Result<Item> {
        if !self.engine.is_open() {
            return Err(RepoError::NotOpen);
        }
        self.engine.view(|tree| {
            self.load_item_in(tree, &item_path(iri), &[], 0)?
                .ok_or_else(|| RepoError::NotFound(iri.to_string()))
        })
    }

    /// Writes a collection descriptor together with its empty membership
    /// list. Fails on bare IRIs and non-collection input.
    pub fn create(&self, col: &Item) -> Result<Item> {
        if !self.engine.is_open() {
            return Err(RepoError::NotOpen);
        }
        if col.is_link() {
            return Err(RepoError::InvalidArgument(
                "cannot create a collection from a bare IRI".into(),
            ));
        }
        if col.as_collection().is_none() {
            return Err(RepoError::InvalidArgument(format!(
                "cannot create a collection from a {}",
                col.type_name()
            )));
        }
        let prefix = item_path(col.id());
        if prefix.is_empty() {
            return Err(RepoError::InvalidArgument(format!(
                "collection has an invalid IRI {}",
                col.id()
            )));
        }
        self.engine.update(|tree, batch| {
            let raw = encode_item(col).map_err(RepoError::encode)?;
            batch.insert(object_key(&prefix), raw);
            if tree.get(items_key(&prefix))?.is_none() {
                let empty = encode_iri_list(&[]).map_err(RepoError::encode)?;
                batch.insert(items_key(&prefix), empty);
            }
            Ok(())
        })?;
        self.cache_clear();
        Ok(col.clone())
    }

    /// Writes `it` under its IRI. The first write of an actor or object
    /// also creates its owned sub-collections; re-writes only replace the
    /// item blob.
    pub fn save(&self, it: &Item) -> Result<Item> {
        if !self.engine.is_open() {
            return Err(RepoError::NotOpen);
        }
        if it.is_link() {
            return Err(RepoError::InvalidArgument("cannot save a bare IRI".into()));
        }
        let prefix = item_path(it.id());
        if prefix.is_empty() {
            return Err(RepoError::InvalidArgument(format!(
                "item has an invalid IRI {}",
                it.id()
            )));
        }
        let saved = self.engine.update(|tree, batch| {
            let mut it = it.clone();
            if let Some(base) = it.base_mut() {
                base.published = base.published.map(truncate_to_seconds);
            }
            let key = object_key(&prefix);
            let first_write = tree.get(&key)?.is_none();
            if first_write {
                self.create_collections(tree, batch, &mut it);
            }
            let raw = encode_item(&it).map_err(RepoError::encode)?;
            batch.insert(key, raw);
            if it.is_collection() && tree.get(items_key(&prefix))?.is_none() {
                let empty = encode_iri_list(&[]).map_err(RepoError::encode)?;
                batch.insert(items_key(&prefix), empty);
            }
            Ok(it)
        })?;
        self.cache_clear();
        info!(iri = %saved.id(), typ = saved.type_name(), "saved item");
        Ok(saved)
    }

    /// Removes the item blob. Collection input deletes member-wise; owned
    /// sub-collections are left alone (see [`Repo::delete_collections`])
    /// and membership entries elsewhere are filtered out at read time.
    pub fn delete(&self, it: &Item) -> Result<()> {
        if !self.engine.is_open() {
            return Err(RepoError::NotOpen);
        }
        if let Some(col) = it.as_collection() {
            for member in col.members() {
                if let Err(e) = self.delete(member) {
                    warn!(iri = %member.id(), error = %e, "unable to remove member");
                }
            }
            return Ok(());
        }
        let stored = self.load_one(it.id())?;
        let prefix = item_path(stored.id());
        self.engine.update(|_, batch| {
            batch.remove(object_key(&prefix));
            Ok(())
        })?;
        self.cache_clear();
        Ok(())
    }

    /// Removes the owned sub-collection keys of an actor or object.
    pub fn delete_collections(&self, it: &Item) -> Result<()> {
        if !self.engine.is_open() {
            return Err(RepoError::NotOpen);
        }
        let owner = it.id().clone();
        let names: &[&str] = if ACTOR_TYPES.contains(&it.type_name()) {
            &fedi3_vocab::collections::ACTOR_COLLECTIONS
        } else {
            &fedi3_vocab::collections::OBJECT_COLLECTIONS
        };
        self.engine.update(|_, batch| {
            for name in names {
                let prefix = item_path(&owner.join(name));
                if prefix.is_empty() {
                    continue;
                }
                batch.remove(object_key(&prefix));
                batch.remove(items_key(&prefix));
            }
            Ok(())
        })?;
        self.cache_clear();
        Ok(())
    }

    /// Appends items to an owned collection. Objectful items not yet in
    /// the store are written through first; hidden collections are created
    /// on the fly; an IRI is appended at most once.
    pub fn add_to(&self, col: &Iri, items: &[Item]) -> Result<()> {
        if !self.engine.is_open() {
            return Err(RepoError::NotOpen);
        }
        let col_path = self.collection_path(col)?;
        for it in items {
            if it.id().is_empty() {
                return Err(RepoError::InvalidArgument(
                    "item does not have a valid IRI".into(),
                ));
            }
        }
        self.engine.update(|tree, batch| {
            let col_key = object_key(&col_path);
            if tree.get(&col_key)?.is_none() && !is_storage_root_key(&col_path) {
                if !is_hidden_collection(col.base_name()) {
                    return Err(RepoError::not_found(&col_key));
                }
                let mut fabricated = Collection::ordered(col.clone());
                if let Some((owner, _)) = col.split_collection() {
                    fabricated.base.attributed_to = Some(Box::new(Item::Iri(owner)));
                }
                let raw = encode_item(&Item::Collection(Box::new(fabricated)))
                    .map_err(RepoError::encode)?;
                batch.insert(col_key, raw);
            }

            for it in items {
                if !it.is_objectful() {
                    continue;
                }
                let prefix = item_path(it.id());
                if prefix.is_empty() {
                    continue;
                }
                let key = object_key(&prefix);
                if tree.get(&key)?.is_none() {
                    let raw = encode_item(it).map_err(RepoError::encode)?;
                    batch.insert(key, raw);
                }
            }

            let mut iris = self.read_items_list(tree, &col_path)?;
            for it in items {
                let link = it.id();
                if !iris.iter().any(|x| x.equals(link, false)) {
                    iris.push(link.clone());
                }
            }
            let raw = encode_iri_list(&iris).map_err(RepoError::encode)?;
            batch.insert(items_key(&col_path), raw);
            Ok(())
        })?;
        self.cache_clear();
        Ok(())
    }

    /// Removes items from an owned collection by link equality, fragment
    /// insensitive.
    pub fn remove_from(&self, col: &Iri, items: &[Item]) -> Result<()> {
        if !self.engine.is_open() {
            return Err(RepoError::NotOpen);
        }
        let col_path = self.collection_path(col)?;
        self.engine.update(|tree, batch| {
            let key = items_key(&col_path);
            let raw = tree.get(&key)?.ok_or_else(|| RepoError::not_found(&key))?;
            let mut iris =
                fedi3_vocab::decode_iri_list(&raw).map_err(RepoError::decode)?;
            for it in items {
                iris.retain(|x| !x.equals(it.id(), false));
            }
            let raw = encode_iri_list(&iris).map_err(RepoError::encode)?;
            batch.insert(key, raw);
            Ok(())
        })?;
        self.cache_clear();
        Ok(())
    }

    /// Seeds the instance actor; used by bootstrap.
    pub fn create_service(&self, mut service: Actor) -> Result<Item> {
        service.base.typ = "Service".to_string();
        let saved = self.save(&Item::Actor(Box::new(service)))?;
        info!(iri = %saved.id(), "created service actor");
        Ok(saved)
    }

    fn collection_path(&self, col: &Iri) -> Result<Vec<u8>> {
        if col.is_empty() {
            return Err(RepoError::InvalidArgument("unable to find collection".into()));
        }
        let p = item_path(col);
        if p.is_empty() {
            return Err(RepoError::InvalidArgument(format!(
                "collection has an invalid IRI {col}"
            )));
        }
        Ok(p)
    }

    fn load_from_path(
        &self,
        iri: &Iri,
        prefix: &[u8],
        checks: &[Check],
        load_max_one: bool,
    ) -> Result<Vec<Item>> {
        self.engine.view(|tree| {
            let mut depth = 0;
            if is_storage_root_key(prefix) {
                depth = 1;
            }
            if iri.split_collection().is_some() {
                depth = 2;
            }

            let mut col = Vec::new();
            let mut path_exists = false;
            for entry in tree.scan_prefix(prefix) {
                let (k, v) = entry?;
                path_exists = true;
                if iter_key_too_deep(prefix, &k, depth) {
                    continue;
                }
                // membership and metadata blobs are not members themselves
                if is_items_key(&k) || !is_object_key(&k) {
                    continue;
                }
                if is_storage_root_inner_key(&k) {
                    continue;
                }
                if let Err(e) = self.load_from_item(tree, &mut col, checks, &v) {
                    warn!(key = %String::from_utf8_lossy(&k), error = %e, "unable to load item");
                    continue;
                }
                if load_max_one && !col.is_empty() {
                    break;
                }
            }
            if !path_exists && col.is_empty() {
                return Err(RepoError::not_found(prefix));
            }
            Ok(col)
        })
    }

    /// The iterator callback: decodes a raw value and feeds the result into
    /// the collection under construction, recursing through links and
    /// nested collections.
    fn load_from_item(
        &self,
        tree: &sled::Tree,
        col: &mut Vec<Item>,
        checks: &[Check],
        raw: &[u8],
    ) -> Result<()> {
        let it = decode_item(raw).map_err(RepoError::decode)?;
        match it {
            Item::Iri(iri) => {
                let resolved =
                    self.load_items_by_iris(tree, checks, std::slice::from_ref(&iri), 0);
                for x in resolved {
                    push_unique(col, x);
                }
            }
            Item::Collection(c) => {
                let iris = self.read_items_list(tree, &item_path(&c.base.id))?;
                let resolved = self.load_items_by_iris(tree, checks, &iris, 0);
                for x in resolved {
                    push_unique(col, x);
                }
            }
            mut other => {
                self.resolve_properties(tree, &mut other, checks, 0);
                if checks::run(&other, checks) {
                    push_unique(col, other);
                }
            }
        }
        Ok(())
    }

    fn load_items_by_iris(
        &self,
        tree: &sled::Tree,
        checks: &[Check],
        iris: &[Iri],
        depth: u8,
    ) -> Vec<Item> {
        let mut out = Vec::new();
        for iri in iris {
            match self.load_item_in(tree, &item_path(iri), checks, depth) {
                Ok(Some(it)) => push_unique(&mut out, it),
                Ok(None) => {}
                // dangling membership entries are tolerated at read time
                Err(e) => debug!(iri = %iri, error = %e, "skipping unresolvable member"),
            }
        }
        out
    }

    fn load_item_in(
        &self,
        tree: &sled::Tree,
        path: &[u8],
        checks: &[Check],
        depth: u8,
    ) -> Result<Option<Item>> {
        if path.is_empty() {
            return Err(RepoError::NotFound("empty item path".into()));
        }
        let key = object_key(path);
        let raw = tree.get(&key)?.ok_or_else(|| RepoError::not_found(&key))?;
        let it = decode_item(&raw).map_err(RepoError::decode)?;
        match it {
            // collections are dereferenced by the caller
            Item::Collection(_) => Ok(Some(it)),
            Item::Iri(iri) => {
                if depth >= MAX_DEREF_DEPTH {
                    return Ok(Some(Item::Iri(iri)));
                }
                self.load_item_in(tree, &item_path(&iri), checks, depth + 1)
            }
            mut other => {
                self.resolve_properties(tree, &mut other, checks, depth);
                if checks::run(&other, checks) {
                    Ok(Some(other))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Lazy on-read resolution: `tag` links always, activity sides only
    /// when the check chain asks for that side.
    fn resolve_properties(&self, tree: &sled::Tree, it: &mut Item, checks: &[Check], depth: u8) {
        if depth >= MAX_DEREF_DEPTH {
            return;
        }
        if let Some(base) = it.base_mut() {
            for t in base.tag.iter_mut() {
                if let Item::Iri(iri) = t {
                    if let Ok(Some(resolved)) =
                        self.load_item_in(tree, &item_path(iri), &[], depth + 1)
                    {
                        *t = resolved;
                    }
                }
            }
        }
        let actor_asked = !checks::actor_checks(checks).is_empty();
        let object_asked = !checks::object_checks(checks).is_empty();
        let target_asked = !checks::target_checks(checks).is_empty();
        if let Some(act) = it.as_activity_mut() {
            if object_asked {
                self.resolve_side(tree, &mut act.object, depth);
            }
            if actor_asked {
                self.resolve_side(tree, &mut act.actor, depth);
            }
            if target_asked {
                self.resolve_side(tree, &mut act.target, depth);
            }
        }
    }

    fn resolve_side(&self, tree: &sled::Tree, slot: &mut Option<Box<Item>>, depth: u8) {
        let Some(inner) = slot else {
            return;
        };
        if let Item::Iri(iri) = inner.as_ref() {
            if let Ok(Some(resolved)) = self.load_item_in(tree, &item_path(iri), &[], depth + 1) {
                *inner = Box::new(resolved);
            }
        }
    }

    fn read_items_list(&self, tree: &sled::Tree, prefix: &[u8]) -> Result<Vec<Iri>> {
        match tree.get(items_key(prefix))? {
            Some(raw) => fedi3_vocab::decode_iri_list(&raw).map_err(RepoError::decode),
            None => Ok(Vec::new()),
        }
    }

    /// On an item's first write, makes sure every owned sub-collection it
    /// references exists with an empty membership list. Bare IRI references
    /// are replaced by empty `OrderedCollection` descriptors; per-collection
    /// failures are logged and skipped.
    fn create_collections(&self, tree: &sled::Tree, batch: &mut sled::Batch, it: &mut Item) {
        let owner = it.id().clone();
        let published = it.base().and_then(|b| b.published);
        if let Item::Actor(a) = it {
            for slot in [
                &mut a.inbox,
                &mut a.outbox,
                &mut a.followers,
                &mut a.following,
                &mut a.liked,
            ] {
                self.create_collection_in(tree, batch, slot, &owner, published);
            }
        }
        if let Some(base) = it.base_mut() {
            for slot in [&mut base.replies, &mut base.likes, &mut base.shares] {
                self.create_collection_in(tree, batch, slot, &owner, published);
            }
        }
    }

    fn create_collection_in(
        &self,
        tree: &sled::Tree,
        batch: &mut sled::Batch,
        slot: &mut Option<Box<Item>>,
        owner: &Iri,
        published: Option<chrono::DateTime<Utc>>,
    ) {
        let Some(reference) = slot.as_deref() else {
            return;
        };
        let col_iri = reference.id().clone();
        let prefix = item_path(&col_iri);
        if prefix.is_empty() {
            warn!(owner = %owner, "sub-collection reference has an invalid IRI");
            return;
        }

        let descriptor = match reference {
            Item::Collection(c) => Item::Collection(c.clone()),
            _ => {
                let mut col = Collection::ordered(col_iri.clone());
                col.base.cc = vec![Item::Iri(Iri::new(PUBLIC_NS))];
                col.base.published =
                    Some(published.map(truncate_to_seconds).unwrap_or_else(|| {
                        truncate_to_seconds(Utc::now())
                    }));
                col.base.attributed_to = Some(Box::new(Item::Iri(owner.clone())));
                Item::Collection(Box::new(col))
            }
        };

        let exists = matches!(tree.get(object_key(&prefix)), Ok(Some(_)));
        if !exists {
            match encode_item(&descriptor) {
                Ok(raw) => {
                    batch.insert(object_key(&prefix), raw);
                    match encode_iri_list(&[]) {
                        Ok(empty) => batch.insert(items_key(&prefix), empty),
                        Err(e) => {
                            warn!(collection = %col_iri, error = %e, "unable to initialize membership list");
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(collection = %col_iri, error = %e, "unable to create sub-collection");
                    return;
                }
            }
        }
        // the owner stores its sub-collections by IRI only
        *slot = Some(Box::new(Item::Iri(col_iri)));
    }

    fn cache_get(&self, iri: &Iri) -> Option<Item> {
        let cache = self.cache.as_ref()?;
        let map = cache.lock().unwrap_or_else(|e| e.into_inner());
        map.get(iri.as_str()).cloned()
    }

    fn cache_put(&self, it: &Item) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let mut map = cache.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(it.id().as_str().to_string(), it.clone());
    }

    fn cache_clear(&self) {
        if let Some(cache) = self.cache.as_ref() {
            cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }
}

/// An item IRI is one that names neither a storage root nor an owned
/// collection.
fn is_item_iri(iri: &Iri) -> bool {
    let p = item_path(iri);
    !is_storage_root_key(&p) && iri.split_collection().is_none()
}

fn push_unique(col: &mut Vec<Item>, it: Item) {
    if !contains_iri(col, it.id()) {
        col.push(it);
    }
}
