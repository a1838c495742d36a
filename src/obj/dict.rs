//! Dict internal representation: a hash table keyed by value-equality
//! (§3.1). Backed by `indexmap::IndexMap` rather than a hand-rolled
//! open-hashed table (see DESIGN.md) — iteration order is not part of
//! the contract (per spec), but `IndexMap` gives the usual Tcl/Jim
//! behavior of dict keys coming back out in insertion order for free.

use super::Obj;
use indexmap::IndexMap;

#[derive(Clone, Default)]
pub struct Dict {
    map: IndexMap<DictKey, Obj>,
}

#[derive(Clone)]
struct DictKey(Obj);

impl PartialEq for DictKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_str() == other.0.to_str()
    }
}
impl Eq for DictKey {}
impl std::hash::Hash for DictKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_str().hash(state)
    }
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Obj, value: Obj) {
        self.map.insert(DictKey(key), value);
    }

    pub fn get(&self, key: &Obj) -> Option<&Obj> {
        self.map.get(&DictKey(key.clone()))
    }

    pub fn remove(&mut self, key: &Obj) -> Option<Obj> {
        self.map.shift_remove(&DictKey(key.clone()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key(&self, key: &Obj) -> bool {
        self.map.contains_key(&DictKey(key.clone()))
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&Obj, &Obj)> {
        self.map.iter().map(|(k, v)| (&k.0, v))
    }
}

/// Parse a dict's canonical form: a flat list of alternating key/value
/// elements, using the same element grammar as [`super::list::parse_list`].
pub fn parse_dict(s: &str) -> Option<Dict> {
    let items = super::list::parse_list(s)?;
    if items.len() % 2 != 0 {
        return None;
    }
    let mut d = Dict::new();
    let mut it = items.into_iter();
    while let (Some(k), Some(v)) = (it.next(), it.next()) {
        d.insert(k, v);
    }
    Some(d)
}

/// Format a dict as its canonical flat key/value list string.
pub fn format_dict(d: &Dict) -> String {
    let mut flat = Vec::with_capacity(d.len() * 2);
    for (k, v) in d.pairs() {
        flat.push(k.clone());
        flat.push(v.clone());
    }
    super::list::format_list(&flat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_unordered_equal() {
        let mut d = Dict::new();
        d.insert(Obj::from_string("a"), Obj::from_string("1"));
        d.insert(Obj::from_string("b"), Obj::from_string("2"));
        let s = format_dict(&d);
        let back = parse_dict(&s).unwrap();
        assert_eq!(back.get(&Obj::from_string("a")).unwrap().to_str(), "1");
        assert_eq!(back.get(&Obj::from_string("b")).unwrap().to_str(), "2");
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn insertion_order_preserved() {
        let mut d = Dict::new();
        d.insert(Obj::from_string("z"), Obj::from_string("1"));
        d.insert(Obj::from_string("a"), Obj::from_string("2"));
        let keys: Vec<String> = d.pairs().map(|(k, _)| k.to_str().into_owned()).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
