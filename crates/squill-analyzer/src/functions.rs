//! Built-in function signatures.
//!
//! The type resolver needs two things from a function: the type of its
//! result, and the type each parameter position expects (so a bind
//! variable in argument position can be inferred). The table covers the
//! SQLite built-ins this front-end meets in practice; an unknown function
//! simply contributes nothing to inference.

use squill_types::{BaseType, ResolvedType};

/// Expected type at one parameter position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Integer,
    Text,
    Real,
    Blob,
    /// No constraint: the argument's own type stands.
    Any,
}

impl ParamType {
    /// The resolved type a bind variable takes at this position, if the
    /// position constrains it.
    #[must_use]
    pub fn expected(self) -> Option<ResolvedType> {
        match self {
            Self::Integer => Some(ResolvedType::integer()),
            Self::Text => Some(ResolvedType::text()),
            Self::Real => Some(ResolvedType::real()),
            Self::Blob => Some(ResolvedType::blob()),
            Self::Any => None,
        }
    }
}

/// How a function's result type is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultRule {
    Fixed(BaseType),
    /// The result takes the type of the given argument position
    /// (`min`, `max`, `nth_value`, ...).
    ArgAt(usize),
    /// The result takes the first resolved argument type (`coalesce`).
    FirstResolvedArg,
}

/// Signature of a built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignature {
    pub params: &'static [ParamType],
    /// Extra arguments beyond `params` repeat the last parameter type.
    pub variadic: bool,
    pub result: ResultRule,
}

impl FunctionSignature {
    /// Expected type for the argument at `index`, if constrained.
    #[must_use]
    pub fn param_expected(&self, index: usize) -> Option<ResolvedType> {
        let param = self.params.get(index).or_else(|| {
            if self.variadic {
                self.params.last()
            } else {
                None
            }
        })?;
        param.expected()
    }
}

const fn fixed(
    params: &'static [ParamType],
    variadic: bool,
    base: BaseType,
) -> FunctionSignature {
    FunctionSignature {
        params,
        variadic,
        result: ResultRule::Fixed(base),
    }
}

/// Look up a built-in signature (ASCII-case-insensitive).
#[must_use]
pub fn signature(name: &str) -> Option<FunctionSignature> {
    use ParamType::{Any, Integer, Real, Text};

    let sig = match name.to_ascii_lowercase().as_str() {
        // Aggregates.
        "count" => fixed(&[Any], true, BaseType::Integer),
        "sum" | "total" | "avg" => fixed(&[Any], false, BaseType::Real),
        "min" | "max" => FunctionSignature {
            params: &[Any],
            variadic: true,
            result: ResultRule::ArgAt(0),
        },
        "group_concat" => fixed(&[Any, Text], true, BaseType::Text),

        // Core scalars.
        "abs" => FunctionSignature {
            params: &[Any],
            variadic: false,
            result: ResultRule::ArgAt(0),
        },
        "round" => fixed(&[Real, Integer], false, BaseType::Real),
        "length" | "octet_length" => fixed(&[Text], false, BaseType::Integer),
        "instr" => fixed(&[Text, Text], false, BaseType::Integer),
        "unicode" => fixed(&[Text], false, BaseType::Integer),
        "char" => fixed(&[Integer], true, BaseType::Text),
        "upper" | "lower" | "trim" | "ltrim" | "rtrim" => fixed(&[Text, Text], true, BaseType::Text),
        "substr" | "substring" => fixed(&[Text, Integer, Integer], false, BaseType::Text),
        "replace" => fixed(&[Text, Text, Text], false, BaseType::Text),
        "hex" => fixed(&[Any], false, BaseType::Text),
        "quote" | "typeof" => fixed(&[Any], false, BaseType::Text),
        "printf" | "format" => fixed(&[Text, Any], true, BaseType::Text),
        "coalesce" | "ifnull" | "nullif" => FunctionSignature {
            params: &[Any],
            variadic: true,
            result: ResultRule::FirstResolvedArg,
        },
        "iif" => FunctionSignature {
            params: &[Any, Any, Any],
            variadic: false,
            result: ResultRule::ArgAt(1),
        },
        "random" => fixed(&[], false, BaseType::Integer),
        "randomblob" | "zeroblob" => fixed(&[Integer], false, BaseType::Blob),
        "likely" | "unlikely" => FunctionSignature {
            params: &[Any],
            variadic: false,
            result: ResultRule::ArgAt(0),
        },
        "likelihood" => FunctionSignature {
            params: &[Any, Real],
            variadic: false,
            result: ResultRule::ArgAt(0),
        },

        // Date and time.
        "date" | "time" | "datetime" | "strftime" => fixed(&[Text, Text], true, BaseType::Text),
        "julianday" => fixed(&[Text, Text], true, BaseType::Real),
        "unixepoch" => fixed(&[Text, Text], true, BaseType::Integer),

        // Window functions.
        "row_number" | "rank" | "dense_rank" => fixed(&[], false, BaseType::Integer),
        "ntile" => fixed(&[Integer], false, BaseType::Integer),
        "cume_dist" | "percent_rank" => fixed(&[], false, BaseType::Real),
        "nth_value" => FunctionSignature {
            params: &[Any, Integer],
            variadic: false,
            result: ResultRule::ArgAt(0),
        },
        "first_value" | "last_value" => FunctionSignature {
            params: &[Any],
            variadic: false,
            result: ResultRule::ArgAt(0),
        },
        "lead" | "lag" => FunctionSignature {
            params: &[Any, Integer, Any],
            variadic: false,
            result: ResultRule::ArgAt(0),
        },

        _ => return None,
    };
    Some(sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_is_integer() {
        let sig = signature("COUNT").expect("known");
        assert_eq!(sig.result, ResultRule::Fixed(BaseType::Integer));
    }

    #[test]
    fn test_nth_value_constrains_second_argument() {
        let sig = signature("nth_value").expect("known");
        assert_eq!(sig.param_expected(0), None);
        assert_eq!(sig.param_expected(1), Some(ResolvedType::integer()));
        assert_eq!(sig.result, ResultRule::ArgAt(0));
    }

    #[test]
    fn test_variadic_repeats_last_param() {
        let sig = signature("printf").expect("known");
        assert_eq!(sig.param_expected(0), Some(ResolvedType::text()));
        // Trailing variadic args are unconstrained (Any repeats).
        assert_eq!(sig.param_expected(5), None);
    }

    #[test]
    fn test_unknown_function_has_no_signature() {
        assert!(signature("no_such_function").is_none());
    }
}
