//! The closed set of operations a listing can contain.

use std::fmt;

use crate::{
    ast::{BinaryOp, CompareOp, UnaryOp},
    value::Value,
};

/// Which name table an instruction addresses. All scopes share one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Name,
    Global,
    Fast,
    Deref,
    Closure,
    ClassDeref,
}

impl Scope {
    fn suffix(self) -> &'static str {
        match self {
            Scope::Name => "NAME",
            Scope::Global => "GLOBAL",
            Scope::Fast => "FAST",
            Scope::Deref => "DEREF",
            Scope::Closure => "CLOSURE",
            Scope::ClassDeref => "CLASSDEREF",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let scope = match suffix {
            "NAME" => Scope::Name,
            "GLOBAL" => Scope::Global,
            "FAST" => Scope::Fast,
            "DEREF" => Scope::Deref,
            "CLOSURE" => Scope::Closure,
            "CLASSDEREF" => Scope::ClassDeref,
            _ => return None,
        };
        Some(scope)
    }
}

/// Native container a `BUILD_*` instruction produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Tuple,
    List,
    Set,
    Map,
    /// Values on the stack, keys in a tuple on top
    ConstKeyMap,
    String,
    TupleUnpack,
    /// Same merge as `TupleUnpack`, emitted for `f(*a, *b)`
    TupleUnpackWithCall,
    ListUnpack,
    SetUnpack,
    MapUnpack,
    MapUnpackWithCall,
}

impl Container {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Container::Tuple => "BUILD_TUPLE",
            Container::List => "BUILD_LIST",
            Container::Set => "BUILD_SET",
            Container::Map => "BUILD_MAP",
            Container::ConstKeyMap => "BUILD_CONST_KEY_MAP",
            Container::String => "BUILD_STRING",
            Container::TupleUnpack => "BUILD_TUPLE_UNPACK",
            Container::TupleUnpackWithCall => "BUILD_TUPLE_UNPACK_WITH_CALL",
            Container::ListUnpack => "BUILD_LIST_UNPACK",
            Container::SetUnpack => "BUILD_SET_UNPACK",
            Container::MapUnpack => "BUILD_MAP_UNPACK",
            Container::MapUnpackWithCall => "BUILD_MAP_UNPACK_WITH_CALL",
        }
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let container = match mnemonic {
            "BUILD_TUPLE" => Container::Tuple,
            "BUILD_LIST" => Container::List,
            "BUILD_SET" => Container::Set,
            "BUILD_MAP" => Container::Map,
            "BUILD_CONST_KEY_MAP" => Container::ConstKeyMap,
            "BUILD_STRING" => Container::String,
            "BUILD_TUPLE_UNPACK" => Container::TupleUnpack,
            "BUILD_TUPLE_UNPACK_WITH_CALL" => Container::TupleUnpackWithCall,
            "BUILD_LIST_UNPACK" => Container::ListUnpack,
            "BUILD_SET_UNPACK" => Container::SetUnpack,
            "BUILD_MAP_UNPACK" => Container::MapUnpack,
            "BUILD_MAP_UNPACK_WITH_CALL" => Container::MapUnpackWithCall,
            _ => return None,
        };
        Some(container)
    }
}

/// In-place fold of the top of stack into a container further down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    ListExtend,
    SetUpdate,
    DictUpdate,
    /// Like `DictUpdate`, but a repeated key is an error
    DictMerge,
}

impl Merge {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Merge::ListExtend => "LIST_EXTEND",
            Merge::SetUpdate => "SET_UPDATE",
            Merge::DictUpdate => "DICT_UPDATE",
            Merge::DictMerge => "DICT_MERGE",
        }
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let merge = match mnemonic {
            "LIST_EXTEND" => Merge::ListExtend,
            "SET_UPDATE" => Merge::SetUpdate,
            "DICT_UPDATE" => Merge::DictUpdate,
            "DICT_MERGE" => Merge::DictMerge,
            _ => return None,
        };
        Some(merge)
    }
}

/// `FORMAT_VALUE` conversion flag (low two bits of the operand).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    None,
    Str,
    Repr,
    Ascii,
}

/// Construct families the compiler refuses to replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Loop,
    Iteration,
    Branch,
    Exception,
    ContextManager,
    Generator,
    Coroutine,
    Import,
    ClassConstruction,
    NestedFunction,
    Annotation,
    AttributeMutation,
    Comprehension,
    Slice,
    Interactive,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Construct::Loop => "loop",
            Construct::Iteration => "iteration",
            Construct::Branch => "branch",
            Construct::Exception => "exception handling",
            Construct::ContextManager => "with block",
            Construct::Generator => "generator",
            Construct::Coroutine => "coroutine",
            Construct::Import => "import",
            Construct::ClassConstruction => "class construction",
            Construct::NestedFunction => "nested function",
            Construct::Annotation => "annotation",
            Construct::AttributeMutation => "attribute assignment",
            Construct::Comprehension => "comprehension",
            Construct::Slice => "slice",
            Construct::Interactive => "interactive print",
        };
        f.write_str(text)
    }
}

/// Category of a mnemonic that is recognised but never replayed.
pub fn unsupported_construct(mnemonic: &str) -> Option<Construct> {
    let construct = match mnemonic {
        "SETUP_LOOP" | "BREAK_LOOP" | "CONTINUE_LOOP" | "FOR_ITER" | "JUMP_ABSOLUTE"
        | "JUMP_BACKWARD" => Construct::Loop,
        "GET_ITER" | "GET_YIELD_FROM_ITER" => Construct::Iteration,
        "JUMP_FORWARD" | "POP_JUMP_IF_TRUE" | "POP_JUMP_IF_FALSE" | "JUMP_IF_TRUE_OR_POP"
        | "JUMP_IF_FALSE_OR_POP" | "JUMP_IF_NOT_EXC_MATCH" => Construct::Branch,
        "SETUP_EXCEPT" | "SETUP_FINALLY" | "POP_BLOCK" | "POP_EXCEPT" | "END_FINALLY"
        | "BEGIN_FINALLY" | "CALL_FINALLY" | "POP_FINALLY" | "RAISE_VARARGS" | "RERAISE"
        | "WITH_EXCEPT_START" => Construct::Exception,
        "SETUP_WITH" | "WITH_CLEANUP_START" | "WITH_CLEANUP_FINISH" => Construct::ContextManager,
        "YIELD_VALUE" | "YIELD_FROM" => Construct::Generator,
        "GET_AWAITABLE" | "GET_AITER" | "GET_ANEXT" | "END_ASYNC_FOR" | "BEFORE_ASYNC_WITH"
        | "SETUP_ASYNC_WITH" => Construct::Coroutine,
        "IMPORT_NAME" | "IMPORT_FROM" | "IMPORT_STAR" => Construct::Import,
        "LOAD_BUILD_CLASS" => Construct::ClassConstruction,
        "MAKE_FUNCTION" => Construct::NestedFunction,
        "SETUP_ANNOTATIONS" => Construct::Annotation,
        "STORE_ATTR" | "DELETE_ATTR" => Construct::AttributeMutation,
        "LIST_APPEND" | "SET_ADD" | "MAP_ADD" => Construct::Comprehension,
        "BUILD_SLICE" => Construct::Slice,
        "PRINT_EXPR" => Construct::Interactive,
        _ => return None,
    };
    Some(construct)
}

/// One replayable operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Nop,
    ExtendedArg(u32),
    PopTop,
    RotTwo,
    RotThree,
    RotFour,
    RotN(usize),
    DupTop,
    DupTopTwo,

    Unary(UnaryOp),
    /// `BINARY_*`; in-place forms decode to the same operator
    Binary(BinaryOp),
    Compare(CompareOp),
    StoreSubscript,
    DeleteSubscript,

    LoadConst(Value),
    Load(Scope, String),
    Store(Scope, String),
    Delete(Scope, String),
    LoadAttr(String),
    LoadMethod(String),

    Build(Container, usize),
    /// Merge the top of stack into the container `n` slots below it
    Merge(Merge, usize),
    ListToTuple,
    UnpackSequence(usize),
    /// `a, *rest, b = ...`
    UnpackEx { before: usize, after: usize },

    CallFunction(usize),
    CallFunctionKw(usize),
    CallFunctionEx { keywords: bool },
    CallMethod(usize),

    FormatValue { conversion: Conversion, with_spec: bool },
    ReturnValue,

    Unsupported { mnemonic: String, construct: Construct },
}

impl Instruction {
    pub fn mnemonic(&self) -> String {
        match self {
            Instruction::Nop => "NOP".to_string(),
            Instruction::ExtendedArg(_) => "EXTENDED_ARG".to_string(),
            Instruction::PopTop => "POP_TOP".to_string(),
            Instruction::RotTwo => "ROT_TWO".to_string(),
            Instruction::RotThree => "ROT_THREE".to_string(),
            Instruction::RotFour => "ROT_FOUR".to_string(),
            Instruction::RotN(_) => "ROT_N".to_string(),
            Instruction::DupTop => "DUP_TOP".to_string(),
            Instruction::DupTopTwo => "DUP_TOP_TWO".to_string(),
            Instruction::Unary(op) => op.mnemonic().to_string(),
            Instruction::Binary(op) => op.mnemonic().to_string(),
            Instruction::Compare(_) => "COMPARE_OP".to_string(),
            Instruction::StoreSubscript => "STORE_SUBSCR".to_string(),
            Instruction::DeleteSubscript => "DELETE_SUBSCR".to_string(),
            Instruction::LoadConst(_) => "LOAD_CONST".to_string(),
            Instruction::Load(scope, _) => format!("LOAD_{}", scope.suffix()),
            Instruction::Store(scope, _) => format!("STORE_{}", scope.suffix()),
            Instruction::Delete(scope, _) => format!("DELETE_{}", scope.suffix()),
            Instruction::LoadAttr(_) => "LOAD_ATTR".to_string(),
            Instruction::LoadMethod(_) => "LOAD_METHOD".to_string(),
            Instruction::Build(container, _) => container.mnemonic().to_string(),
            Instruction::Merge(merge, _) => merge.mnemonic().to_string(),
            Instruction::ListToTuple => "LIST_TO_TUPLE".to_string(),
            Instruction::UnpackSequence(_) => "UNPACK_SEQUENCE".to_string(),
            Instruction::UnpackEx { .. } => "UNPACK_EX".to_string(),
            Instruction::CallFunction(_) => "CALL_FUNCTION".to_string(),
            Instruction::CallFunctionKw(_) => "CALL_FUNCTION_KW".to_string(),
            Instruction::CallFunctionEx { .. } => "CALL_FUNCTION_EX".to_string(),
            Instruction::CallMethod(_) => "CALL_METHOD".to_string(),
            Instruction::FormatValue { .. } => "FORMAT_VALUE".to_string(),
            Instruction::ReturnValue => "RETURN_VALUE".to_string(),
            Instruction::Unsupported { mnemonic, .. } => mnemonic.clone(),
        }
    }
}

/// Listing syntax, accepted back by the parser.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match self {
            Instruction::ExtendedArg(n) => write!(f, "{mnemonic} {n}"),
            Instruction::RotN(n)
            | Instruction::Build(_, n)
            | Instruction::Merge(_, n)
            | Instruction::UnpackSequence(n)
            | Instruction::CallFunction(n)
            | Instruction::CallFunctionKw(n)
            | Instruction::CallMethod(n) => write!(f, "{mnemonic} {n}"),
            Instruction::Compare(op) => write!(f, "{mnemonic} {}", op.symbol()),
            Instruction::LoadConst(value) => write!(f, "{mnemonic} {}", value.repr()),
            Instruction::Load(_, name)
            | Instruction::Store(_, name)
            | Instruction::Delete(_, name)
            | Instruction::LoadAttr(name)
            | Instruction::LoadMethod(name) => write!(f, "{mnemonic} {name}"),
            Instruction::UnpackEx { before, after } => {
                write!(f, "{mnemonic} {}", before | (after << 8))
            }
            Instruction::CallFunctionEx { keywords } => {
                write!(f, "{mnemonic} {}", u8::from(*keywords))
            }
            Instruction::FormatValue {
                conversion,
                with_spec,
            } => {
                let flags = match conversion {
                    Conversion::None => 0,
                    Conversion::Str => 1,
                    Conversion::Repr => 2,
                    Conversion::Ascii => 3,
                } | if *with_spec { 4 } else { 0 };
                write!(f, "{mnemonic} {flags}")
            }
            _ => f.write_str(&mnemonic),
        }
    }
}
