use crate::ast::{Domain, Field, Function, MethodStub, Predicate, TypeId, VALUE_FIELDS};
use crate::cfg::CfgMethod;
use crate::error::ConstructionError;
use hashbrown::HashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

/// A complete verification unit: everything the back end needs to verify the
/// contained methods, with no references to anything outside it.
#[derive(Clone, Debug)]
pub struct Program {
    pub name: String,
    pub domains: Vec<Domain>,
    pub fields: Vec<Field>,
    pub functions: Vec<Function>,
    pub stub_methods: Vec<MethodStub>,
    pub methods: Vec<CfgMethod>,
    // Keyed by type: each type has at most one predicate shape.
    predicates: HashMap<TypeId, Predicate, BuildHasherDefault<FxHasher>>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Program {
            name: name.into(),
            domains: Vec::new(),
            // The primitive value fields are always declared; encoders add
            // the per-type fields on top.
            fields: VALUE_FIELDS.clone(),
            functions: Vec::new(),
            stub_methods: Vec::new(),
            methods: Vec::new(),
            predicates: HashMap::default(),
        }
    }

    pub fn add_predicate(&mut self, predicate: Predicate) -> Result<(), ConstructionError> {
        let typ = predicate.typ().clone();
        match self.predicates.entry(typ) {
            hashbrown::hash_map::Entry::Occupied(entry) => Err(ConstructionError::DuplicatePredicate {
                typ: entry.key().clone(),
            }),
            hashbrown::hash_map::Entry::Vacant(entry) => {
                entry.insert(predicate);
                Ok(())
            }
        }
    }

    pub fn predicate(&self, typ: &TypeId) -> Option<&Predicate> {
        self.predicates.get(typ)
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// Predicates in type-name order, so consumers emit deterministically.
    pub fn sorted_predicates(&self) -> Vec<&Predicate> {
        let mut predicates: Vec<_> = self.predicates.values().collect();
        predicates.sort_by(|a, b| a.typ().cmp(b.typ()));
        predicates
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{LocalVar, StructPredicate, Type};

    fn struct_predicate(name: &str) -> Predicate {
        let typ = TypeId::new(name);
        let this = LocalVar::new("self", Type::typed_ref(name));
        Predicate::Struct(StructPredicate::new(typ, this, None))
    }

    #[test]
    fn value_fields_are_predeclared() {
        let program = Program::new("p");
        let names: Vec<_> = program.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["val_bool", "val_int"]);
    }

    #[test]
    fn second_predicate_for_same_type_is_rejected() {
        let mut program = Program::new("p");
        program.add_predicate(struct_predicate("T")).unwrap();
        let err = program.add_predicate(struct_predicate("T")).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::DuplicatePredicate {
                typ: TypeId::new("T"),
            }
        );
        assert_eq!(program.predicate_count(), 1);
    }

    #[test]
    fn sorted_predicates_are_ordered_by_type() {
        let mut program = Program::new("p");
        program.add_predicate(struct_predicate("Zeta")).unwrap();
        program.add_predicate(struct_predicate("Alpha")).unwrap();
        program.add_predicate(struct_predicate("Mid")).unwrap();
        let names: Vec<_> = program
            .sorted_predicates()
            .iter()
            .map(|p| p.typ().name().to_owned())
            .collect();
        assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
    }
}
