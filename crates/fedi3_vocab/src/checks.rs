/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Filter predicates applied to load results.
//!
//! A chain of checks is conjunctive. Nested `Actor`/`Object`/`Target`
//! chains apply to the corresponding side of an activity and double as the
//! signal that the store should dereference that side before filtering.

use crate::iri::Iri;
use crate::item::Item;

#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Item type equals any of the given names.
    HasType(Vec<String>),
    /// Item id equals the IRI, fragment-insensitive.
    IriIs(Iri),
    /// `name` field equals the given string.
    NameIs(String),
    /// Nested chain over an activity's `actor`.
    Actor(Vec<Check>),
    /// Nested chain over an activity's `object`.
    Object(Vec<Check>),
    /// Nested chain over an activity's `target`.
    Target(Vec<Check>),
    Not(Box<Check>),
    AnyOf(Vec<Check>),
    /// Pagination: keep at most this many items of a materialized
    /// collection. Ignored when matching a single item.
    MaxItems(usize),
    /// Pagination cursor: keep only the items after the one with this
    /// IRI. A cursor that is no longer a member keeps the whole page.
    After(Iri),
}

pub fn has_type(name: &str) -> Check {
    Check::HasType(vec![name.to_string()])
}

pub fn iri_is(iri: impl Into<Iri>) -> Check {
    Check::IriIs(iri.into())
}

pub fn name_is(name: &str) -> Check {
    Check::NameIs(name.to_string())
}

pub fn actor(checks: impl Into<Vec<Check>>) -> Check {
    Check::Actor(checks.into())
}

pub fn object(checks: impl Into<Vec<Check>>) -> Check {
    Check::Object(checks.into())
}

pub fn target(checks: impl Into<Vec<Check>>) -> Check {
    Check::Target(checks.into())
}

impl Check {
    fn matches(&self, it: &Item) -> bool {
        match self {
            Check::HasType(names) => names.iter().any(|n| n == it.type_name()),
            Check::IriIs(iri) => it.id().equals(iri, false),
            Check::NameIs(name) => it
                .base()
                .and_then(|b| b.name.as_deref())
                .is_some_and(|n| n == name),
            Check::Actor(sub) => side_matches(it.as_activity().and_then(|a| a.actor.as_deref()), sub),
            Check::Object(sub) => side_matches(it.as_activity().and_then(|a| a.object.as_deref()), sub),
            Check::Target(sub) => side_matches(it.as_activity().and_then(|a| a.target.as_deref()), sub),
            Check::Not(inner) => !inner.matches(it),
            Check::AnyOf(any) => any.iter().any(|c| c.matches(it)),
            Check::MaxItems(_) | Check::After(_) => true,
        }
    }
}

fn side_matches(side: Option<&Item>, checks: &[Check]) -> bool {
    match side {
        Some(it) => run(it, checks),
        None => false,
    }
}

/// Conjunction of the whole chain; an empty chain accepts everything.
pub fn run(it: &Item, checks: &[Check]) -> bool {
    checks.iter().all(|c| c.matches(it))
}

/// The nested chain for an activity's `actor`, when any check asks for it.
pub fn actor_checks(checks: &[Check]) -> Vec<Check> {
    nested(checks, |c| match c {
        Check::Actor(sub) => Some(sub),
        _ => None,
    })
}

/// The nested chain for an activity's `object`.
pub fn object_checks(checks: &[Check]) -> Vec<Check> {
    nested(checks, |c| match c {
        Check::Object(sub) => Some(sub),
        _ => None,
    })
}

/// The nested chain for an activity's `target`.
pub fn target_checks(checks: &[Check]) -> Vec<Check> {
    nested(checks, |c| match c {
        Check::Target(sub) => Some(sub),
        _ => None,
    })
}

/// Page size requested by the chain, if any.
pub fn max_items(checks: &[Check]) -> Option<usize> {
    checks.iter().find_map(|c| match c {
        Check::MaxItems(n) => Some(*n),
        _ => None,
    })
}

/// Pagination cursor requested by the chain, if any.
pub fn after(checks: &[Check]) -> Option<&Iri> {
    checks.iter().find_map(|c| match c {
        Check::After(iri) => Some(iri),
        _ => None,
    })
}

fn nested<'a>(checks: &'a [Check], pick: fn(&'a Check) -> Option<&'a Vec<Check>>) -> Vec<Check> {
    let mut out = Vec::new();
    for c in checks {
        if let Some(sub) = pick(c) {
            out.extend(sub.iter().cloned());
        }
    }
    out
}
