//! Latencies measure the relative durations of hardware execution in clock
//! ticks.
//!
//! A [`Latency`] is characterized by a minimum and a maximum number of clocks.
//! For entities whose execution time is known precisely the two are equal. A
//! latency may also be *open*, in which case its maximum is unknown.
//!
//! Latencies form a partial order: for two latencies `m` and `n`,
//! `!m.is_ge(&n)` does **not** imply `n.is_gt(&m)`. Scheduling code must
//! treat incomparable latencies as distinct timing paths.
use forge_utils::{Error, ForgeResult};
use linked_hash_map::LinkedHashMap;
use std::{
    cmp::Ordering,
    collections::HashSet,
    fmt::Debug,
    hash::{Hash, Hasher},
    rc::Rc,
};

/// Distinguishes open latencies that share a base but arise from different
/// causes. Keys take part in equality only, never in ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LatencyKey(u32);

impl LatencyKey {
    /// The key of every fixed latency.
    pub const BASE: LatencyKey = LatencyKey(0);

    /// A key for the `id`-th source of open latencies. Distinct ids give
    /// distinct keys, none of which is [`LatencyKey::BASE`].
    pub const fn new(id: u32) -> Self {
        LatencyKey(id + 1)
    }
}

impl std::fmt::Display for LatencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            0 => write!(f, "base"),
            n => write!(f, "k{}", n - 1),
        }
    }
}

/// A known range of clocks. Construct through [`Latency::get`] or
/// [`Latency::range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    min: u64,
    max: u64,
}

impl Interval {
    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }
}

/// A latency derived from `base` whose maximum number of clocks is unknown.
#[derive(Debug)]
pub struct OpenLatency {
    base: Latency,
    increment: u64,
    key: LatencyKey,
    min: u64,
}

impl OpenLatency {
    fn latency(base: Latency, increment: u64, key: LatencyKey) -> Latency {
        let min = base.min_clocks().saturating_add(increment);
        Latency::Open(Rc::new(OpenLatency {
            base,
            increment,
            key,
            min,
        }))
    }

    /// The latency this one was opened from.
    pub fn base(&self) -> &Latency {
        &self.base
    }

    /// Minimum clocks added on top of the base.
    pub fn increment(&self) -> u64 {
        self.increment
    }
}

/// The flattened constituents of an AND or OR latency along with cached
/// bounds.
#[derive(Debug)]
pub struct CompositeLatency {
    /// Canonically ordered and free of duplicates.
    latencies: Vec<Latency>,
    min: u64,
    max: Option<u64>,
    open: bool,
    key: LatencyKey,
}

impl CompositeLatency {
    pub fn latencies(&self) -> &[Latency] {
        &self.latencies
    }
}

/// An immutable, freely shared measure of time in clocks.
#[derive(Clone, Debug)]
pub enum Latency {
    /// An exactly known range of clocks, e.g. [`Latency::ZERO`].
    Fixed(Interval),
    /// A lower bound only; see [`Latency::open`].
    Open(Rc<OpenLatency>),
    /// The latest of several latencies, e.g. a scoreboard of control paths.
    And(Rc<CompositeLatency>),
    /// A choice among several latencies, e.g. merging control paths.
    Or(Rc<CompositeLatency>),
}

impl Latency {
    /// 0 clocks (i.e. combinational)
    pub const ZERO: Latency = Latency::Fixed(Interval { min: 0, max: 0 });

    /// 1 clock
    pub const ONE: Latency = Latency::Fixed(Interval { min: 1, max: 1 });

    /// The latency of exactly `clocks` clocks.
    pub const fn get(clocks: u64) -> Latency {
        Latency::Fixed(Interval {
            min: clocks,
            max: clocks,
        })
    }

    /// The latency of a known range of clocks.
    pub fn range(min: u64, max: u64) -> ForgeResult<Latency> {
        if max < min {
            return Err(Error::invalid_latency(format!(
                "maximum of {max} clocks is below the minimum of {min}"
            )));
        }
        Ok(Latency::Fixed(Interval { min, max }))
    }

    /// The latency representing the latest of `latencies`. A single latency
    /// is returned unchanged and nested AND latencies are flattened.
    pub fn and<I>(latencies: I, key: LatencyKey) -> Latency
    where
        I: IntoIterator<Item = Latency>,
    {
        Self::composite(latencies, key, true)
    }

    /// The latency representing a choice among `latencies`. A single latency
    /// is returned unchanged and nested OR latencies are flattened.
    pub fn or<I>(latencies: I, key: LatencyKey) -> Latency
    where
        I: IntoIterator<Item = Latency>,
    {
        Self::composite(latencies, key, false)
    }

    fn composite<I>(latencies: I, key: LatencyKey, is_and: bool) -> Latency
    where
        I: IntoIterator<Item = Latency>,
    {
        let mut flat = Vec::new();
        for latency in latencies {
            match (&latency, is_and) {
                (Latency::And(inner), true) | (Latency::Or(inner), false) => {
                    flat.extend(inner.latencies.iter().cloned())
                }
                _ => flat.push(latency),
            }
        }
        flat.sort_by(Latency::canonical_cmp);
        flat.dedup();

        match flat.as_slice() {
            [] => return Latency::ZERO,
            [single] => return single.clone(),
            _ => {}
        }

        let mins = flat.iter().map(Latency::min_clocks);
        let min = if is_and { mins.max() } else { mins.min() }.unwrap_or(0);
        let max = flat
            .iter()
            .map(Latency::max_clocks)
            .collect::<Option<Vec<_>>>()
            .and_then(|maxes| maxes.into_iter().max());
        let open = flat.iter().any(Latency::is_open);
        let composite = Rc::new(CompositeLatency {
            latencies: flat,
            min,
            max,
            open,
            key,
        });
        if is_and {
            Latency::And(composite)
        } else {
            Latency::Or(composite)
        }
    }

    /// Takes a map of object to latency pairings and returns the pairings
    /// whose latencies are not dominated by any other.
    ///
    /// If all latencies are comparable, only the single latest survives. If
    /// some latencies are not comparable with the latest, they survive too,
    /// since no single safe bound exists. Among equal latencies the one keyed
    /// by a member of `preferred` is kept; otherwise the later one in the
    /// map's order replaces the earlier.
    pub fn get_latest<K>(
        latencies: &LinkedHashMap<K, Latency>,
        preferred: &HashSet<K>,
    ) -> LinkedHashMap<K, Latency>
    where
        K: Clone + Eq + Hash + Debug,
    {
        let mut latest: Vec<(K, Latency)> = Vec::with_capacity(latencies.len());
        for (key, latency) in latencies {
            log::trace!("latest: testing {key:?} => {latency}");
            let mut add = false;
            let mut trash = Vec::new();
            for (idx, (saved_key, saved)) in latest.iter().enumerate() {
                if latency == saved {
                    add = !preferred.contains(saved_key);
                    if add {
                        trash.push(idx);
                    }
                    break;
                } else if latency.is_ge(saved) {
                    log::trace!("latest: {latency} dominates {saved}");
                    add = true;
                    trash.push(idx);
                } else if saved.is_ge(latency) {
                    log::trace!("latest: {saved} dominates {latency}");
                    add = false;
                    trash.clear();
                    break;
                } else {
                    log::trace!(
                        "latest: {latency} and {saved} are incomparable"
                    );
                    add = true;
                }
            }
            for idx in trash.into_iter().rev() {
                latest.remove(idx);
            }
            if add || latest.is_empty() {
                latest.push((key.clone(), latency.clone()));
            }
        }
        latest.into_iter().collect()
    }

    /// The non-negative minimum number of clocks.
    pub fn min_clocks(&self) -> u64 {
        match self {
            Latency::Fixed(interval) => interval.min,
            Latency::Open(open) => open.min,
            Latency::And(comp) | Latency::Or(comp) => comp.min,
        }
    }

    /// The maximum number of clocks, or `None` if it is unknown.
    pub fn max_clocks(&self) -> Option<u64> {
        match self {
            Latency::Fixed(interval) => Some(interval.max),
            Latency::Open(_) => None,
            Latency::And(comp) | Latency::Or(comp) => comp.max,
        }
    }

    pub fn key(&self) -> LatencyKey {
        match self {
            Latency::Fixed(_) => LatencyKey::BASE,
            Latency::Open(open) => open.key,
            Latency::And(comp) | Latency::Or(comp) => comp.key,
        }
    }

    /// True if this latency represents an exact, known range of clocks.
    /// Composite latencies are never fixed even when their bounds coincide.
    pub fn is_fixed(&self) -> bool {
        matches!(self, Latency::Fixed(_))
    }

    /// True if the maximum number of clocks is not known, or if any
    /// constituent of a composite latency is open.
    pub fn is_open(&self) -> bool {
        match self {
            Latency::Fixed(_) => false,
            Latency::Open(_) => true,
            Latency::And(comp) | Latency::Or(comp) => comp.open,
        }
    }

    /// The latency that is at least as great as this one but whose maximum
    /// is unknown. `key` distinguishes the result from other open latencies
    /// created from this latency.
    pub fn open(&self, key: LatencyKey) -> Latency {
        self.increment_open(0, key)
    }

    /// The result of incrementing this latency by a known range of clocks.
    /// Clock counts saturate at `u64::MAX`.
    pub fn increment(&self, min: u64, max: u64) -> Latency {
        match self {
            Latency::Fixed(interval) => Latency::Fixed(Interval {
                min: interval.min.saturating_add(min),
                max: interval.max.saturating_add(max),
            }),
            Latency::Open(open) => OpenLatency::latency(
                open.base.clone(),
                open.increment.saturating_add(min),
                open.key,
            ),
            Latency::And(comp) => Latency::and(
                comp.latencies.iter().map(|l| l.increment(min, max)),
                comp.key,
            ),
            Latency::Or(comp) => Latency::or(
                comp.latencies.iter().map(|l| l.increment(min, max)),
                comp.key,
            ),
        }
    }

    /// The result of incrementing this latency by `min` clocks and an
    /// unknown maximum. Composite latencies keep their own key; `key` is
    /// pushed into each constituent.
    pub fn increment_open(&self, min: u64, key: LatencyKey) -> Latency {
        match self {
            Latency::Fixed(_) | Latency::Open(_) => {
                OpenLatency::latency(self.clone(), min, key)
            }
            Latency::And(comp) => Latency::and(
                comp.latencies.iter().map(|l| l.increment_open(min, key)),
                comp.key,
            ),
            Latency::Or(comp) => Latency::or(
                comp.latencies.iter().map(|l| l.increment_open(min, key)),
                comp.key,
            ),
        }
    }

    /// The latency of this latency followed by `other`, i.e. `other` shifted
    /// by the clocks this latency represents.
    pub fn add_to(&self, other: &Latency) -> Latency {
        match self {
            Latency::Fixed(interval) => {
                other.increment(interval.min, interval.max)
            }
            Latency::Open(open) => other.increment_open(open.min, open.key),
            Latency::And(comp) => Latency::and(
                comp.latencies.iter().map(|l| l.add_to(other)),
                comp.key,
            ),
            Latency::Or(comp) => Latency::or(
                comp.latencies.iter().map(|l| l.add_to(other)),
                comp.key,
            ),
        }
    }

    /// True if this latency can be shown to come after `other` because it
    /// was derived from `other` by one or more open operations.
    pub fn is_descendant_of(&self, other: &Latency) -> bool {
        match self {
            Latency::Fixed(_) => false,
            Latency::Open(open) => {
                open.base == *other
                    || open.base.is_descendant_of(other)
                    || matches!(other, Latency::Open(ancestor)
                        if ancestor.key == open.key
                            && ancestor.base == open.base
                            && open.increment > ancestor.increment)
            }
            Latency::And(comp) => {
                comp.latencies.iter().any(|l| l.is_descendant_of(other))
            }
            Latency::Or(comp) => {
                comp.latencies.iter().all(|l| l.is_descendant_of(other))
            }
        }
    }

    /// True if this latency is provably greater than `other`. A false result
    /// does not imply that this latency is less than or equal to `other`.
    pub fn is_gt(&self, other: &Latency) -> bool {
        match (self, other) {
            (Latency::And(comp), _) => {
                comp.latencies.iter().any(|l| l.is_gt(other))
            }
            (Latency::Or(comp), _) => {
                comp.latencies.iter().all(|l| l.is_gt(other))
            }
            (_, Latency::And(comp)) | (_, Latency::Or(comp)) => {
                comp.latencies.iter().all(|l| self.is_gt(l))
            }
            (Latency::Fixed(mine), Latency::Fixed(theirs)) => {
                mine.min > theirs.max
            }
            (Latency::Fixed(_), Latency::Open(_)) => false,
            (Latency::Open(mine), Latency::Fixed(theirs)) => {
                mine.min > theirs.max
                    || (self.is_descendant_of(other) && mine.min > theirs.min)
            }
            (Latency::Open(mine), Latency::Open(theirs)) => {
                self.is_descendant_of(other) && mine.min > theirs.min
            }
        }
    }

    /// True if this latency is provably greater than or equal to `other`. A
    /// false result does not imply that this latency is less than `other`.
    pub fn is_ge(&self, other: &Latency) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Latency::And(mine), Latency::And(theirs))
                if theirs.latencies.iter().all(|t| {
                    mine.latencies
                        .iter()
                        .any(|m| m == t || m.is_descendant_of(t))
                }) =>
            {
                true
            }
            (Latency::And(comp), _) => {
                comp.latencies.iter().any(|l| l.is_ge(other))
            }
            (Latency::Or(comp), _) => {
                comp.latencies.iter().all(|l| l.is_ge(other))
            }
            (_, Latency::And(comp)) | (_, Latency::Or(comp)) => {
                comp.latencies.iter().all(|l| self.is_ge(l))
            }
            (Latency::Fixed(mine), Latency::Fixed(theirs)) => {
                mine.min >= theirs.max
            }
            (Latency::Fixed(_), Latency::Open(_)) => false,
            (Latency::Open(mine), Latency::Fixed(theirs)) => {
                self.is_descendant_of(other) || mine.min >= theirs.max
            }
            (Latency::Open(mine), Latency::Open(theirs)) => {
                self.is_descendant_of(other) && mine.min >= theirs.min
            }
        }
    }

    /// A structural total order used only to keep composite constituents in
    /// a canonical order. It says nothing about which latency is later.
    fn canonical_cmp(&self, other: &Latency) -> Ordering {
        fn rank(l: &Latency) -> u8 {
            match l {
                Latency::Fixed(_) => 0,
                Latency::Open(_) => 1,
                Latency::And(_) => 2,
                Latency::Or(_) => 3,
            }
        }
        fn slices(a: &[Latency], b: &[Latency]) -> Ordering {
            a.len().cmp(&b.len()).then_with(|| {
                a.iter()
                    .zip(b)
                    .map(|(x, y)| x.canonical_cmp(y))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
        }
        rank(self).cmp(&rank(other)).then_with(|| match (self, other) {
            (Latency::Fixed(a), Latency::Fixed(b)) => {
                (a.min, a.max).cmp(&(b.min, b.max))
            }
            (Latency::Open(a), Latency::Open(b)) => a
                .increment
                .cmp(&b.increment)
                .then(a.key.0.cmp(&b.key.0))
                .then_with(|| a.base.canonical_cmp(&b.base)),
            (Latency::And(a), Latency::And(b)) => {
                slices(&a.latencies, &b.latencies)
            }
            (Latency::Or(a), Latency::Or(b)) => a
                .key
                .0
                .cmp(&b.key.0)
                .then_with(|| slices(&a.latencies, &b.latencies)),
            _ => Ordering::Equal,
        })
    }
}

/// Structural equality. Open and OR latencies must also agree on their key;
/// AND latencies ignore it because the latest of the same constituents
/// arrives on the same clock regardless of provenance.
impl PartialEq for Latency {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Latency::Fixed(a), Latency::Fixed(b)) => a == b,
            (Latency::Open(a), Latency::Open(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.increment == b.increment
                        && a.key == b.key
                        && a.base == b.base)
            }
            (Latency::And(a), Latency::And(b)) => {
                Rc::ptr_eq(a, b) || a.latencies == b.latencies
            }
            (Latency::Or(a), Latency::Or(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.key == b.key && a.latencies == b.latencies)
            }
            _ => false,
        }
    }
}

impl Eq for Latency {}

impl Hash for Latency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Latency::Fixed(interval) => {
                0_u8.hash(state);
                interval.hash(state);
            }
            Latency::Open(open) => {
                1_u8.hash(state);
                open.increment.hash(state);
                open.key.hash(state);
                open.base.hash(state);
            }
            Latency::And(comp) => {
                2_u8.hash(state);
                comp.latencies.hash(state);
            }
            Latency::Or(comp) => {
                3_u8.hash(state);
                comp.key.hash(state);
                comp.latencies.hash(state);
            }
        }
    }
}

impl std::fmt::Display for Latency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn list(
            f: &mut std::fmt::Formatter<'_>,
            latencies: &[Latency],
        ) -> std::fmt::Result {
            write!(f, "{{")?;
            for (idx, latency) in latencies.iter().enumerate() {
                if idx != 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{latency}")?;
            }
            write!(f, "}}")
        }
        match self {
            Latency::Fixed(interval) => {
                write!(f, "[{}:{}]", interval.min, interval.max)
            }
            Latency::Open(open) => {
                let (key, base) = (open.key, &open.base);
                write!(f, "Open<{key}>({base}+{})", open.increment)
            }
            Latency::And(comp) => {
                write!(f, "And<{}>", comp.key)?;
                list(f, &comp.latencies)
            }
            Latency::Or(comp) => {
                write!(f, "Or<{}>", comp.key)?;
                list(f, &comp.latencies)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Latency, LatencyKey};
    use linked_hash_map::LinkedHashMap;
    use std::collections::{HashSet, hash_map::DefaultHasher};
    use std::hash::{Hash, Hasher};

    const K1: LatencyKey = LatencyKey::new(1);
    const K2: LatencyKey = LatencyKey::new(2);

    fn hash_of(l: &Latency) -> u64 {
        let mut h = DefaultHasher::new();
        l.hash(&mut h);
        h.finish()
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        assert!(Latency::range(3, 2).is_err());
        let l = Latency::range(2, 3).unwrap();
        assert_eq!((l.min_clocks(), l.max_clocks()), (2, Some(3)));
        assert!(l.is_fixed() && !l.is_open());
    }

    #[test]
    fn incomparable_open_latencies() {
        let a = Latency::get(2).open(K1);
        let b = Latency::get(5).open(K2);
        assert!(!a.is_ge(&b));
        assert!(!b.is_ge(&a));
        assert!(!a.is_gt(&b) && !b.is_gt(&a));
    }

    #[test]
    fn and_or_duality() {
        let l1 = Latency::get(2);
        let l2 = Latency::get(5);
        let and = Latency::and([l1.clone(), l2.clone()], K1);
        let or = Latency::or([l1, l2], K1);
        assert_eq!((and.min_clocks(), and.max_clocks()), (5, Some(5)));
        assert_eq!((or.min_clocks(), or.max_clocks()), (2, Some(5)));
        assert!(!and.is_fixed() && !or.is_fixed());
    }

    #[test]
    fn composites_flatten() {
        let a = Latency::get(1);
        let b = Latency::get(2).open(K1);
        let c = Latency::get(3);
        let nested = Latency::and(
            [Latency::and([a.clone(), b.clone()], K1), c.clone()],
            K2,
        );
        let flat = Latency::and([a, b, c], K1);
        assert_eq!(nested, flat);
        assert_eq!(hash_of(&nested), hash_of(&flat));
        let Latency::And(comp) = &nested else {
            panic!("expected an AND latency, got {nested}")
        };
        assert_eq!(comp.latencies().len(), 3);
        assert!(nested.is_open());
    }

    #[test]
    fn nested_choices_flatten() {
        let a = Latency::get(1);
        let b = Latency::get(2).open(K1);
        let c = Latency::range(3, 4).unwrap();
        let inner = Latency::or([a.clone(), b.clone()], K2);
        let nested = Latency::or([inner, c.clone()], K2);
        let flat = Latency::or([a, b, c], K2);
        assert_eq!(nested, flat);
        assert_eq!(hash_of(&nested), hash_of(&flat));
        let Latency::Or(comp) = &nested else {
            panic!("expected an OR latency, got {nested}")
        };
        assert_eq!(comp.latencies().len(), 3);
        assert_eq!((nested.min_clocks(), nested.max_clocks()), (1, None));
    }

    #[test]
    fn open_range_follows_its_base() {
        let base = Latency::range(2, 5).unwrap();
        let open = base.open(K1);
        assert!(open.is_descendant_of(&base));
        assert!(open.is_ge(&base));
        assert!(!open.is_gt(&base));
        assert!(!base.is_ge(&open));
        let later = base.increment_open(1, K1);
        assert!(later.is_gt(&base));

        let mut map = LinkedHashMap::new();
        map.insert("base", base);
        map.insert("open", open);
        let latest = Latency::get_latest(&map, &HashSet::new());
        assert_eq!(latest.keys().copied().collect::<Vec<_>>(), ["open"]);
    }

    #[test]
    fn increments_saturate() {
        let top = Latency::get(u64::MAX);
        assert_eq!(top.increment(1, 2), top);
        assert_eq!(Latency::get(3).add_to(&top), top);
        assert_eq!(top.increment_open(4, K1).min_clocks(), u64::MAX);
    }

    #[test]
    fn singletons_are_not_wrapped() {
        let a = Latency::get(4).open(K1);
        assert_eq!(Latency::or([a.clone()], K2), a);
        assert_eq!(Latency::and([a.clone(), a.clone()], K2), a);
        assert_eq!(Latency::and([], K2), Latency::ZERO);
    }

    #[test]
    fn open_latencies_keep_their_key() {
        let base = Latency::get(3);
        let a = base.open(K1);
        let b = base.open(K2);
        assert_eq!(a.min_clocks(), b.min_clocks());
        assert_eq!(a.max_clocks(), None);
        assert_ne!(a, b);
        assert_eq!(a, base.open(K1));
        assert!(a.is_descendant_of(&base));
        assert!(a.is_ge(&base) && !base.is_ge(&a));
    }

    #[test]
    fn or_equality_uses_key_and_does_not() {
        let parts = [Latency::get(1), Latency::get(4)];
        assert_ne!(
            Latency::or(parts.clone(), K1),
            Latency::or(parts.clone(), K2)
        );
        assert_eq!(
            Latency::and(parts.clone(), K1),
            Latency::and(parts, K2)
        );
    }

    #[test]
    fn add_to_with_fixed_base() {
        let l = Latency::ZERO
            .add_to(&Latency::get(3))
            .add_to(&Latency::get(2));
        assert_eq!(l, Latency::ZERO.add_to(&Latency::get(5)));
        assert_eq!((l.min_clocks(), l.max_clocks()), (5, Some(5)));
    }

    #[test]
    fn open_add_to_reattaches_key() {
        let open = Latency::get(2).open(K1);
        let shifted = open.add_to(&Latency::get(3));
        assert_eq!(shifted.min_clocks(), 5);
        assert_eq!(shifted.key(), K1);
        assert!(shifted.is_descendant_of(&Latency::get(3)));
        // Incrementing an open latency keeps it on the same chain.
        let later = shifted.increment(1, 1);
        assert!(later.is_gt(&shifted));
        assert!(!shifted.is_ge(&later));
    }

    #[test]
    fn composite_ordering() {
        let and = Latency::and([Latency::get(2), Latency::get(7)], K1);
        let or = Latency::or([Latency::get(2), Latency::get(7)], K1);
        // The latest of {2, 7} is after 6, a choice of {2, 7} is not.
        assert!(and.is_gt(&Latency::get(6)));
        assert!(!or.is_gt(&Latency::get(6)));
        assert!(or.is_ge(&Latency::get(2)));
        assert!(Latency::get(8).is_gt(&or));
        assert!(Latency::get(8).is_gt(&and));
        let bigger = Latency::and(
            [Latency::get(2), Latency::get(7), Latency::get(1).open(K2)],
            K1,
        );
        assert!(bigger.is_ge(&and));
    }

    #[test]
    fn get_latest_retains_incomparable_survivors() {
        let mut map = LinkedHashMap::new();
        map.insert("a", Latency::get(3).open(K1));
        map.insert("b", Latency::get(3).open(K2));
        map.insert("c", Latency::get(1));
        let latest = Latency::get_latest(&map, &HashSet::new());
        assert_eq!(latest.keys().copied().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn get_latest_collapses_comparable_candidates() {
        let mut map = LinkedHashMap::new();
        map.insert("short", Latency::get(1));
        map.insert("long", Latency::get(4));
        map.insert("mid", Latency::range(2, 3).unwrap());
        let latest = Latency::get_latest(&map, &HashSet::new());
        assert_eq!(latest.len(), 1);
        assert_eq!(latest["long"], Latency::get(4));
    }

    #[test]
    fn get_latest_prefers_preferred_ties() {
        let mut map = LinkedHashMap::new();
        map.insert("x", Latency::get(2));
        map.insert("y", Latency::get(2));
        let latest = Latency::get_latest(&map, &HashSet::from(["x"]));
        assert_eq!(latest.keys().copied().collect::<Vec<_>>(), ["x"]);
        let latest = Latency::get_latest(&map, &HashSet::new());
        assert_eq!(latest.keys().copied().collect::<Vec<_>>(), ["y"]);
    }

    use proptest::prelude::*;

    fn fixed() -> impl Strategy<Value = Latency> {
        (0_u64..64, 0_u64..8).prop_map(|(min, spread)| {
            Latency::range(min, min + spread).unwrap()
        })
    }

    proptest! {
        #[test]
        fn and_or_bounds(l1 in fixed(), l2 in fixed()) {
            let and = Latency::and([l1.clone(), l2.clone()], K1);
            let or = Latency::or([l1.clone(), l2.clone()], K1);
            let max = l1.max_clocks().max(l2.max_clocks());
            prop_assert_eq!(and.max_clocks(), max);
            prop_assert_eq!(or.max_clocks(), max);
            let (min1, min2) = (l1.min_clocks(), l2.min_clocks());
            prop_assert_eq!(and.min_clocks(), min1.max(min2));
            prop_assert_eq!(or.min_clocks(), min1.min(min2));
        }

        #[test]
        fn fixed_add_to_is_associative(
            a in fixed(),
            b in fixed(),
            c in fixed()
        ) {
            prop_assert_eq!(
                a.add_to(&b).add_to(&c),
                a.add_to(&b.add_to(&c))
            );
        }

        #[test]
        fn ge_is_reflexive_and_gt_is_irreflexive(a in fixed(), b in fixed()) {
            let open = a.open(K1);
            let and = Latency::and([a.clone(), open.clone()], K2);
            for l in [&a, &open, &and] {
                prop_assert!(l.is_ge(l));
                prop_assert!(!l.is_gt(l));
            }
            if a.is_gt(&b) {
                prop_assert!(a.is_ge(&b));
                prop_assert!(!b.is_ge(&a));
            }
        }

        #[test]
        fn latest_dominates_every_input(
            ls in proptest::collection::vec(fixed(), 1..8)
        ) {
            let map: LinkedHashMap<usize, Latency> =
                ls.iter().cloned().enumerate().collect();
            let latest = Latency::get_latest(&map, &HashSet::new());
            prop_assert!(!latest.is_empty());
            for l in &ls {
                let covered =
                    latest.values().any(|s| s.is_ge(l) || !l.is_ge(s));
                prop_assert!(covered);
            }
        }
    }
}
