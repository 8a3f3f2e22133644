//! Well-known library names, matched exactly.
//!
//! Every list below is a closed set of fully qualified names. Matching is
//! always by string equality, never by prefix, so a user type can not take
//! over a privileged name by accident.

use serde::{Deserialize, Serialize};

/// Naming generation of the safe-memory library the checked code uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    #[default]
    Safememory,
    Nodecpp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamePolicy {
    pub policy: Policy,
    pub owning_ptr: &'static [&'static str],
    pub soft_ptr: &'static [&'static str],
    pub nullable_ptr: &'static [&'static str],
    pub awaitable: &'static [&'static str],
    pub soft_ptr_cast: &'static [&'static str],
    pub wait_for_all: &'static [&'static str],
    pub node_base: &'static [&'static str],
    pub std_move_or_forward: &'static [&'static str],
    pub stack_only_iterator: &'static [&'static str],
    pub vector: &'static [&'static str],
    pub hashmap: &'static [&'static str],
    pub string_literal: &'static [&'static str],
    pub basic_string: &'static [&'static str],
    pub std_function: &'static [&'static str],
    /// Functions always safe to call, independent of the library database.
    pub builtin_safe_functions: &'static [&'static str],
    /// Methods of smart pointer classes that are always safe to call.
    pub safe_ptr_methods: &'static [&'static str],
    /// How diagnostics spell the nullable pointer kind.
    pub nullable_label: &'static str,
    /// Hashmap key, hasher and equality must be deep-const; hasher and
    /// equality need a `[[no_side_effect]]` call operator.
    pub hashmap_rules: bool,
}

const STD_MOVE_OR_FORWARD: &[&str] = &["std::move", "std::__1::move", "std::forward", "std::__1::forward"];
const STD_FUNCTION: &[&str] = &["std::function", "std::__1::function"];
const STRING_LITERAL: &[&str] = &["nodecpp::string_literal", "safememory::basic_string_literal"];
const NODE_BASE: &[&str] = &["NodeBase", "nodecpp::NodeBase", "nodecpp::net::NodeBase"];
const AWAITABLE: &[&str] = &["nodecpp::awaitable"];
const WAIT_FOR_ALL: &[&str] = &["nodecpp::wait_for_all"];
const SAFE_PTR_METHODS: &[&str] = &["operator*", "operator->", "operator=", "operator bool", "get"];

fn listed(list: &[&str], name: &str) -> bool {
    list.iter().any(|n| *n == name)
}

impl NamePolicy {
    pub fn for_policy(policy: Policy) -> Self {
        match policy {
            Policy::Safememory => Self::safememory(),
            Policy::Nodecpp => Self::nodecpp(),
        }
    }

    pub fn safememory() -> Self {
        Self {
            policy: Policy::Safememory,
            owning_ptr: &[
                "safememory::owning_ptr",
                "safememory::detail::owning_ptr_impl",
                "safememory::detail::owning_ptr_base_impl",
            ],
            soft_ptr: &[
                "safememory::soft_ptr",
                "safememory::detail::soft_ptr_impl",
                "safememory::detail::soft_ptr_base_impl",
                "safememory::soft_this_ptr",
                "safememory::detail::soft_this_ptr_impl",
                "safememory::detail::soft_this_ptr_base_impl",
                "safememory::soft_this_ptr2",
                "safememory::detail::soft_this_ptr2_impl",
            ],
            nullable_ptr: &[
                "safememory::nullable_ptr",
                "safememory::detail::nullable_ptr_impl",
                "safememory::detail::nullable_ptr_base_impl",
            ],
            awaitable: AWAITABLE,
            soft_ptr_cast: &[
                "safememory::soft_ptr_static_cast",
                "safememory::soft_ptr_reinterpret_cast",
                "safememory::nullable_cast",
            ],
            wait_for_all: WAIT_FOR_ALL,
            node_base: NODE_BASE,
            std_move_or_forward: STD_MOVE_OR_FORWARD,
            stack_only_iterator: &[
                "eastl::node_iterator",
                "safememory::detail::hashtable_stack_only_iterator",
                "safememory::detail::array_stack_only_iterator",
            ],
            vector: &["safememory::vector", "safememory::vector_safe"],
            hashmap: &[
                "safememory::unordered_map",
                "safememory::unordered_map_safe",
                "safememory::unordered_multimap",
                "safememory::unordered_multimap_safe",
            ],
            string_literal: STRING_LITERAL,
            basic_string: &["safememory::basic_string", "safememory::basic_string_safe"],
            std_function: STD_FUNCTION,
            builtin_safe_functions: &["__builtin_coro_frame"],
            safe_ptr_methods: SAFE_PTR_METHODS,
            nullable_label: "nullable_ptr",
            hashmap_rules: true,
        }
    }

    pub fn nodecpp() -> Self {
        Self {
            policy: Policy::Nodecpp,
            owning_ptr: &[
                "nodecpp::safememory::owning_ptr",
                "nodecpp::safememory::owning_ptr_impl",
                "nodecpp::safememory::owning_ptr_no_checks",
            ],
            soft_ptr: &[
                "nodecpp::safememory::soft_ptr",
                "nodecpp::safememory::soft_ptr_impl",
                "nodecpp::safememory::soft_ptr_no_checks",
                "nodecpp::safememory::soft_this_ptr",
                "nodecpp::safememory::soft_this_ptr_impl",
                "nodecpp::safememory::soft_this_ptr_no_checks",
            ],
            nullable_ptr: &[
                "nodecpp::safememory::naked_ptr",
                "nodecpp::safememory::naked_ptr_impl",
                "nodecpp::safememory::naked_ptr_no_checks",
                "nodecpp::safememory::const_naked_ptr",
            ],
            awaitable: AWAITABLE,
            soft_ptr_cast: &[
                "nodecpp::safememory::soft_ptr_static_cast",
                "nodecpp::safememory::soft_ptr_reinterpret_cast",
            ],
            wait_for_all: WAIT_FOR_ALL,
            node_base: NODE_BASE,
            std_move_or_forward: STD_MOVE_OR_FORWARD,
            stack_only_iterator: &[],
            vector: &[],
            hashmap: &[],
            string_literal: STRING_LITERAL,
            basic_string: &[],
            std_function: STD_FUNCTION,
            builtin_safe_functions: &[
                "__builtin_coro_frame",
                "nodecpp::safememory::make_owning",
                "nodecpp::wait_for_all",
            ],
            safe_ptr_methods: SAFE_PTR_METHODS,
            nullable_label: "naked_ptr",
            hashmap_rules: false,
        }
    }

    pub fn is_owning_ptr_name(&self, name: &str) -> bool {
        listed(self.owning_ptr, name)
    }

    /// Owning or soft pointer.
    pub fn is_safe_ptr_name(&self, name: &str) -> bool {
        self.is_owning_ptr_name(name) || listed(self.soft_ptr, name)
    }

    pub fn is_nullable_ptr_name(&self, name: &str) -> bool {
        listed(self.nullable_ptr, name)
    }

    pub fn is_awaitable_name(&self, name: &str) -> bool {
        listed(self.awaitable, name)
    }

    pub fn is_soft_ptr_cast_name(&self, name: &str) -> bool {
        listed(self.soft_ptr_cast, name)
    }

    pub fn is_wait_for_all_name(&self, name: &str) -> bool {
        listed(self.wait_for_all, name)
    }

    pub fn is_node_base_name(&self, name: &str) -> bool {
        listed(self.node_base, name)
    }

    pub fn is_std_move_or_forward(&self, name: &str) -> bool {
        listed(self.std_move_or_forward, name)
    }

    pub fn is_stack_only_iterator_name(&self, name: &str) -> bool {
        listed(self.stack_only_iterator, name)
    }

    pub fn is_vector_name(&self, name: &str) -> bool {
        listed(self.vector, name)
    }

    pub fn is_hashmap_name(&self, name: &str) -> bool {
        listed(self.hashmap, name)
    }

    pub fn is_string_literal_name(&self, name: &str) -> bool {
        listed(self.string_literal, name)
    }

    pub fn is_basic_string_name(&self, name: &str) -> bool {
        listed(self.basic_string, name)
    }

    pub fn is_std_function_name(&self, name: &str) -> bool {
        listed(self.std_function, name)
    }

    pub fn is_builtin_safe_function(&self, name: &str) -> bool {
        listed(self.builtin_safe_functions, name)
    }

    pub fn is_safe_ptr_method_name(&self, name: &str) -> bool {
        listed(self.safe_ptr_methods, name)
    }

    /// Names that keep their special rules even when a database or an unsafe
    /// namespace would whitelist them.
    pub fn is_privileged_name(&self, name: &str) -> bool {
        self.is_safe_ptr_name(name) || self.is_nullable_ptr_name(name) || self.is_awaitable_name(name)
    }
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self::safememory()
    }
}
