use proptest::prelude::*;
use safecheck_ast::{QualType, UnitBuilder};
use safecheck_core::{CheckContext, CheckerConfig, CheckerData, Diagnostics};

/// Shapes of types the classifier recurses through.
#[derive(Clone, Debug)]
enum Shape {
    Int,
    RawPtr,
    Owning(Box<Shape>),
    Vector(Box<Shape>),
    Struct(Vec<Shape>),
}

impl Shape {
    fn is_safe(&self) -> bool {
        match self {
            Shape::Int => true,
            Shape::RawPtr => false,
            Shape::Owning(inner) | Shape::Vector(inner) => inner.is_safe(),
            Shape::Struct(fields) => fields.iter().all(Shape::is_safe),
        }
    }

    fn build(&self, b: &mut UnitBuilder, next: &mut usize) -> QualType {
        match self {
            Shape::Int => b.int(),
            Shape::RawPtr => {
                let int = b.int();
                b.pointer(int)
            }
            Shape::Owning(inner) => {
                let t = inner.build(b, next);
                b.instance("safememory::owning_ptr", &[t])
            }
            Shape::Vector(inner) => {
                let t = inner.build(b, next);
                b.instance("safememory::vector", &[t])
            }
            Shape::Struct(fields) => {
                let root = b.namespace("");
                let r = b.struct_decl(root, &format!("S{next}"));
                *next += 1;
                for (i, field) in fields.iter().enumerate() {
                    let t = field.build(b, next);
                    b.field(r, &format!("f{i}"), t);
                }
                b.record_type(r)
            }
        }
    }
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![3 => Just(Shape::Int), 1 => Just(Shape::RawPtr)];
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| Shape::Owning(Box::new(s))),
            inner.clone().prop_map(|s| Shape::Vector(Box::new(s))),
            prop::collection::vec(inner, 0..4).prop_map(Shape::Struct),
        ]
    })
}

proptest! {
    #[test]
    fn verdict_matches_composition(s in shape()) {
        let mut b = UnitBuilder::new();
        let t = s.build(&mut b, &mut 0);
        let unit = b.finish();
        let config = CheckerConfig::default();
        let cx = CheckContext::new(&unit, &config);

        prop_assert_eq!(CheckerData::new().is_heap_safe(&cx, t), s.is_safe());
    }

    #[test]
    fn repeated_queries_agree_and_report_once(s in shape()) {
        let mut b = UnitBuilder::new();
        let t = s.build(&mut b, &mut 0);
        let unit = b.finish();
        let config = CheckerConfig::default();
        let cx = CheckContext::new(&unit, &config);

        let mut data = CheckerData::new();
        let first = data.is_heap_safe(&cx, t);
        let cached = data.len();
        prop_assert_eq!(data.is_heap_safe(&cx, t), first);
        prop_assert_eq!(data.len(), cached);

        let mut sink = Diagnostics::new();
        data.report_non_safe_detail(&cx, t, &mut sink);
        let reported = sink.len();
        if first {
            prop_assert_eq!(reported, 0);
        }
        data.report_non_safe_detail(&cx, t, &mut sink);
        prop_assert_eq!(sink.len(), reported);
    }

    #[test]
    fn one_unsafe_argument_poisons_the_container(
        safe in prop::collection::vec(Just(Shape::Int), 0..3),
        at in 0usize..3,
    ) {
        let mut fields = safe;
        let at = at.min(fields.len());
        fields.insert(at, Shape::RawPtr);
        let s = Shape::Vector(Box::new(Shape::Struct(fields)));

        let mut b = UnitBuilder::new();
        let t = s.build(&mut b, &mut 0);
        let unit = b.finish();
        let config = CheckerConfig::default();
        let cx = CheckContext::new(&unit, &config);

        prop_assert!(!CheckerData::new().is_heap_safe(&cx, t));
    }
}

#[test]
fn mutually_recursive_records_terminate() {
    let mut b = UnitBuilder::new();
    let root = b.namespace("");
    let int = b.int();
    let a = b.struct_decl(root, "A");
    let c = b.struct_decl(root, "C");
    let (a_t, c_t) = (b.record_type(a), b.record_type(c));
    let to_c = b.instance("safememory::owning_ptr", &[c_t]);
    let to_a = b.instance("safememory::soft_ptr", &[a_t]);
    b.field(a, "c", to_c);
    b.field(a, "value", int);
    b.field(c, "back", to_a);
    let unit = b.finish();
    let config = CheckerConfig::default();
    let cx = CheckContext::new(&unit, &config);

    let mut data = CheckerData::new();
    assert!(data.is_heap_safe(&cx, a_t));
    assert!(data.is_heap_safe(&cx, c_t));
    assert!(data.is_deterministic(&cx, to_c));
}
