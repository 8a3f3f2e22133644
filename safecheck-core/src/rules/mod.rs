//! Rule visitors: one pass over a translation unit per enabled rule.
//!
//! Rules only look at user code. Everything declared in a system file is
//! skipped unless an enclosing namespace is tagged `check_as_user_code`.

mod assignment;
mod determinism;
mod may_extend;
mod record_decl;
mod return_check;
mod var_decl;

use std::fmt;
use std::str::FromStr;

use safecheck_ast::{Expr, FunctionId, Location, RecordId, StmtKind, TranslationUnit, VarId};
use serde::{Deserialize, Serialize};

use crate::checker_data::CheckerData;
use crate::config::CheckerConfig;
use crate::context::CheckContext;
use crate::diag::{Diagnostics, DiagnosticSink, Severity};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    RecordDecl,
    VarDecl,
    RawPointerAssignment,
    Return,
    MayExtend,
    Determinism,
}

impl Rule {
    pub const ALL: [Rule; 6] = [
        Rule::RecordDecl,
        Rule::VarDecl,
        Rule::RawPointerAssignment,
        Rule::Return,
        Rule::MayExtend,
        Rule::Determinism,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rule::RecordDecl => "record-decl",
            Rule::VarDecl => "var-decl",
            Rule::RawPointerAssignment => "raw-pointer-assignment",
            Rule::Return => "return",
            Rule::MayExtend => "may-extend",
            Rule::Determinism => "determinism",
        }
    }

    fn run(self, run: &mut RuleRun<'_>) {
        match self {
            Rule::RecordDecl => record_decl::run(run),
            Rule::VarDecl => var_decl::run(run),
            Rule::RawPointerAssignment => assignment::run(run),
            Rule::Return => return_check::run(run),
            Rule::MayExtend => may_extend::run(run),
            Rule::Determinism => determinism::run(run),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRule(pub String);

impl fmt::Display for UnknownRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown rule `{}`", self.0)
    }
}

impl std::error::Error for UnknownRule {}

impl FromStr for Rule {
    type Err = UnknownRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rule::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| UnknownRule(s.to_string()))
    }
}

/// State shared by the rules of one run: the context, the verdict cache and
/// the collected diagnostics.
pub(crate) struct RuleRun<'c> {
    pub cx: &'c CheckContext<'c>,
    pub data: CheckerData,
    pub sink: Diagnostics,
}

impl<'c> RuleRun<'c> {
    fn new(cx: &'c CheckContext<'c>) -> Self {
        Self {
            cx,
            data: CheckerData::new(),
            sink: Diagnostics::new(),
        }
    }

    pub fn error(&mut self, location: Location, message: &str) {
        self.sink.report(location, message, Severity::Error);
    }

    pub fn note(&mut self, location: Location, message: &str) {
        self.sink.report(location, message, Severity::Note);
    }

    /// Record definitions that belong to user code.
    pub fn user_records(&self) -> Vec<RecordId> {
        let cx = self.cx;
        cx.unit
            .record_ids()
            .filter(|id| {
                let r = cx.unit.record(*id);
                r.has_definition() && cx.is_user_code(r.location, r.context)
            })
            .collect()
    }

    /// Functions with a body that belong to user code.
    pub fn user_functions(&self) -> Vec<FunctionId> {
        let cx = self.cx;
        cx.unit
            .function_ids()
            .filter(|id| {
                let f = cx.unit.function(*id);
                f.body.is_some() && cx.is_user_code(f.location, f.context)
            })
            .collect()
    }

    /// Variables of user functions, plus globals declared in user files.
    pub fn user_vars(&self) -> Vec<VarId> {
        let cx = self.cx;
        cx.unit
            .var_ids()
            .filter(|id| {
                let v = cx.unit.var(*id);
                match v.function {
                    Some(f) => {
                        let f = cx.unit.function(f);
                        cx.is_user_code(f.location, f.context)
                    }
                    None => !cx.is_system_location(v.location),
                }
            })
            .collect()
    }
}

/// Every expression node of a function body, variable initializers
/// included, parents before children.
pub(crate) fn function_exprs(unit: &TranslationUnit, function: FunctionId) -> Vec<&Expr> {
    let mut out = Vec::new();
    for id in unit.body_stmts(function) {
        let stmt = unit.stmt(id);
        if let StmtKind::Decl(vars) = &stmt.kind {
            for v in vars {
                if let Some(init) = &unit.var(*v).init {
                    init.walk(&mut |e| out.push(e));
                }
            }
        }
        for e in stmt.exprs() {
            e.walk(&mut |n| out.push(n));
        }
    }
    out
}

/// Runs the enabled rules over translation units.
///
/// The determinism rule is enabled only when the options ask for it.
#[derive(Debug)]
pub struct Checker<'a> {
    config: &'a CheckerConfig,
    rules: Vec<Rule>,
}

impl<'a> Checker<'a> {
    pub fn new(config: &'a CheckerConfig) -> Self {
        let rules = Rule::ALL
            .into_iter()
            .filter(|r| *r != Rule::Determinism || config.options.determinism)
            .collect();
        Self { config, rules }
    }

    /// Replaces the enabled rules.
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules = rules.into_iter().collect();
        self.rules.sort();
        self.rules.dedup();
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn check_unit(&self, unit: &TranslationUnit) -> Diagnostics {
        let cx = CheckContext::new(unit, self.config);
        let mut run = RuleRun::new(&cx);
        for rule in &self.rules {
            let _span = tracing::debug_span!("rule", name = rule.name()).entered();
            run.sink.set_rule(rule.name());
            let before = run.sink.len();
            rule.run(&mut run);
            tracing::debug!(reported = run.sink.len() - before, "rule done");
        }
        tracing::info!(
            diagnostics = run.sink.len(),
            errors = run.sink.error_count(),
            cached = run.data.len(),
            "check finished"
        );
        run.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckerOptions;
    use crate::config::Whitelist;
    use safecheck_ast::UnitBuilder;

    #[test]
    fn rule_names_round_trip() {
        for rule in Rule::ALL {
            assert_eq!(rule.name().parse::<Rule>(), Ok(rule));
        }
        assert!("s5-1".parse::<Rule>().is_err());
    }

    #[test]
    fn determinism_is_opt_in() {
        let config = CheckerConfig::default();
        assert!(!Checker::new(&config).rules().contains(&Rule::Determinism));

        let opts = CheckerOptions {
            determinism: true,
            ..CheckerOptions::default()
        };
        let config = CheckerConfig::new(opts, Whitelist::new());
        assert!(Checker::new(&config).rules().contains(&Rule::Determinism));
    }

    #[test]
    fn initializers_are_part_of_the_body() {
        let mut b = UnitBuilder::new();
        let int = b.int();
        let f = b.function("f", &[], int);
        let x = b.local(f, "x", int);
        let one = b.integer(1);
        b.init(x, one);
        let decl = b.decl_stmt(&[x]);
        let x_ref = b.var_ref(x);
        let ret = b.return_stmt(Some(x_ref));
        let body = b.compound(&[decl, ret]);
        b.set_body(f, body);
        let unit = b.finish();

        let kinds: Vec<_> = function_exprs(&unit, f).iter().map(|e| e.kind_name()).collect();
        assert_eq!(kinds, ["IntegerLiteral", "DeclRef"]);
    }

    #[test]
    fn system_declarations_are_not_user_code() {
        let mut b = UnitBuilder::new();
        let sm = b.namespace("safememory");
        b.system_struct(sm, "detail_helper");
        let root = b.namespace("");
        let mine = b.struct_decl(root, "Mine");
        let unit = b.finish();
        let config = CheckerConfig::default();
        let cx = CheckContext::new(&unit, &config);
        let run = RuleRun::new(&cx);
        assert_eq!(run.user_records(), vec![mine]);
    }
}
