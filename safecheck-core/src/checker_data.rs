//! Per-run memo of classifier verdicts.
//!
//! Keyed by canonical type identity (top-level `const` ignored). Queries run
//! a quiet classifier once per type and kind; the detail reports re-run it
//! with a notes helper, at most once per type and kind.

use std::collections::HashMap;

use safecheck_ast::{QualType, TypeId};

use crate::context::CheckContext;
use crate::diag::{DiagHelper, DiagnosticSink};
use crate::qualified_name::type_spelling;
use crate::type_checker::{SafetyVerdict, TypeChecker};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Slot {
    HeapSafe,
    Deterministic,
    StackOnly,
    NullablePtr,
    NakedStruct,
    DeepConst,
}

impl Slot {
    /// Whether a verdict deserves a detail report.
    fn is_failure(self, verdict: SafetyVerdict) -> bool {
        match self {
            Slot::HeapSafe | Slot::Deterministic => !verdict.is_ok,
            Slot::StackOnly => false,
            Slot::NullablePtr | Slot::NakedStruct | Slot::DeepConst => {
                verdict.is_kind && !verdict.is_ok
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    verdict: SafetyVerdict,
    reported: bool,
}

#[derive(Debug, Default)]
pub struct CheckerData {
    entries: HashMap<(TypeId, Slot), Entry>,
}

impl CheckerData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached verdicts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn compute(tc: &mut TypeChecker<'_, '_>, qt: QualType, slot: Slot) -> SafetyVerdict {
        let flag = |b: bool| SafetyVerdict::new(b, b);
        match slot {
            Slot::HeapSafe => flag(tc.is_safe_type(qt)),
            Slot::Deterministic => flag(tc.is_deterministic_type(qt)),
            Slot::StackOnly => flag(tc.is_stack_only_type(qt)),
            Slot::NullablePtr => tc.nullable_ptr_verdict(qt),
            Slot::NakedStruct => tc.naked_struct_verdict(qt),
            Slot::DeepConst => tc.is_deep_const_type(qt),
        }
    }

    fn verdict(&mut self, cx: &CheckContext<'_>, qt: QualType, slot: Slot) -> SafetyVerdict {
        let qt = cx.canonical(qt);
        if let Some(entry) = self.entries.get(&(qt.ty, slot)) {
            return entry.verdict;
        }
        let verdict = Self::compute(&mut TypeChecker::quiet(cx), qt, slot);
        tracing::debug!(
            ty = %type_spelling(cx.unit, qt),
            ?slot,
            is_kind = verdict.is_kind,
            is_ok = verdict.is_ok,
            "classified"
        );
        self.entries.insert(
            (qt.ty, slot),
            Entry {
                verdict,
                reported: false,
            },
        );
        verdict
    }

    fn report(
        &mut self,
        cx: &CheckContext<'_>,
        qt: QualType,
        slot: Slot,
        sink: &mut dyn DiagnosticSink,
    ) {
        let qt = cx.canonical(qt);
        let verdict = self.verdict(cx, qt, slot);
        if !slot.is_failure(verdict) {
            return;
        }
        let Some(entry) = self.entries.get_mut(&(qt.ty, slot)) else {
            return;
        };
        if entry.reported {
            return;
        }
        entry.reported = true;
        let mut tc = TypeChecker::new(cx, DiagHelper::notes(sink));
        Self::compute(&mut tc, qt, slot);
    }

    pub fn is_heap_safe(&mut self, cx: &CheckContext<'_>, qt: QualType) -> bool {
        self.verdict(cx, qt, Slot::HeapSafe).is_ok
    }

    /// Explains, once per type, why it is not heap safe.
    pub fn report_non_safe_detail(
        &mut self,
        cx: &CheckContext<'_>,
        qt: QualType,
        sink: &mut dyn DiagnosticSink,
    ) {
        self.report(cx, qt, Slot::HeapSafe, sink);
    }

    pub fn is_deterministic(&mut self, cx: &CheckContext<'_>, qt: QualType) -> bool {
        self.verdict(cx, qt, Slot::Deterministic).is_ok
    }

    pub fn report_deterministic_detail(
        &mut self,
        cx: &CheckContext<'_>,
        qt: QualType,
        sink: &mut dyn DiagnosticSink,
    ) {
        self.report(cx, qt, Slot::Deterministic, sink);
    }

    pub fn is_stack_only(&mut self, cx: &CheckContext<'_>, qt: QualType) -> bool {
        self.verdict(cx, qt, Slot::StackOnly).is_ok
    }

    pub fn check_nullable_ptr(&mut self, cx: &CheckContext<'_>, qt: QualType) -> SafetyVerdict {
        self.verdict(cx, qt, Slot::NullablePtr)
    }

    pub fn report_nullable_ptr_detail(
        &mut self,
        cx: &CheckContext<'_>,
        qt: QualType,
        sink: &mut dyn DiagnosticSink,
    ) {
        self.report(cx, qt, Slot::NullablePtr, sink);
    }

    pub fn check_naked_struct(&mut self, cx: &CheckContext<'_>, qt: QualType) -> SafetyVerdict {
        self.verdict(cx, qt, Slot::NakedStruct)
    }

    pub fn report_naked_struct_detail(
        &mut self,
        cx: &CheckContext<'_>,
        qt: QualType,
        sink: &mut dyn DiagnosticSink,
    ) {
        self.report(cx, qt, Slot::NakedStruct, sink);
    }

    pub fn check_deep_const(&mut self, cx: &CheckContext<'_>, qt: QualType) -> SafetyVerdict {
        self.verdict(cx, qt, Slot::DeepConst)
    }

    pub fn report_deep_const_detail(
        &mut self,
        cx: &CheckContext<'_>,
        qt: QualType,
        sink: &mut dyn DiagnosticSink,
    ) {
        self.report(cx, qt, Slot::DeepConst, sink);
    }
}
