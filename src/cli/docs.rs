//! Documentation content for the ckq CLI

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Listing,
    Opcodes,
    Functions,
    Clauses,
    Values,
    Errors,
}

impl DocCategory {
    /// Parse category name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "listing" | "listings" | "syntax" => Some(Self::Listing),
            "opcodes" | "opcode" | "instructions" => Some(Self::Opcodes),
            "functions" | "function" | "builtins" => Some(Self::Functions),
            "clauses" | "clause" | "statements" => Some(Self::Clauses),
            "values" | "value" | "literals" => Some(Self::Values),
            "errors" | "error" => Some(Self::Errors),
            _ => None,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"CKQ DOCUMENTATION

ckq replays a function's instruction listing on a symbolic stack machine and
renders the result as ClickHouse SQL. Parameters become identifiers, host
values become literals, and operators become dialect function calls.

DOCUMENTATION CATEGORIES

  listing           Listing file format: header, bindings, instructions, literals
  opcodes           Supported instructions and the constructs that are rejected
  functions         Operator-to-function mapping, builtins and native methods
  clauses           Statement keywords and clause chaining
  values            How native values render as dialect literals
  errors            Error kinds and what triggers them

QUICK REFERENCE

  def q(x):             Template header (optional, first line)
  global t = 'users'    Global binding
  LOAD_FAST x           Parameter becomes identifier `x`
  BINARY_ADD            plus(a, b)
  RETURN_VALUE          Ends the trace; the stack must then be empty

Run 'ckq doc <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    match DocCategory::from_name(name) {
        Some(DocCategory::Listing) => Ok(LISTING_DOC),
        Some(DocCategory::Opcodes) => Ok(OPCODES_DOC),
        Some(DocCategory::Functions) => Ok(FUNCTIONS_DOC),
        Some(DocCategory::Clauses) => Ok(CLAUSES_DOC),
        Some(DocCategory::Values) => Ok(VALUES_DOC),
        Some(DocCategory::Errors) => Ok(ERRORS_DOC),
        None => Err(CliError::UnknownCategory(name.to_string())),
    }
}

const LISTING_DOC: &str = r#"LISTING - File Format

A listing is line oriented. '#' starts a comment and blank lines are ignored.

HEADER
  def NAME(p1, p2=LITERAL, ...):
    Optional, and only as the first line. The trailing ':' may be omitted.
    Without a header the template is called 'query' and takes no parameters.
    Parameters with defaults must follow those without.

BINDINGS
  global NAME = LITERAL
  closure NAME = LITERAL
    Values visible to the trace by name. Parameters shadow closure bindings,
    which shadow globals.

INSTRUCTIONS
  [OFFSET] MNEMONIC [OPERAND]
    A leading offset, as printed by disassemblers, is ignored, as are '>>'
    jump markers and a trailing '(...)' annotation.

    Example:
      def active(t):
        LOAD_GLOBAL select
        LOAD_CONST ...
        CALL_FUNCTION 1
        LOAD_METHOD from_
        LOAD_FAST t
        CALL_METHOD 1
        RETURN_VALUE

OPERANDS
  Names              for LOAD_*, STORE_*, DELETE_*, LOAD_ATTR, LOAD_METHOD
  Integers           for counts and flags
  Literals           for LOAD_CONST
  <, <=, ==, !=, >, >=, in, not in, is, is not
                     for COMPARE_OP
  0 / 1              for IS_OP and CONTAINS_OP (1 negates)

LITERALS
  None True False ...
  42  -7  3.5  1e3  inf  nan  2j  (1+2j)
  'text'  "text"  b'bytes'      backslash escapes: \n \t \r \0 \\ \' \" \xHH
  (a, b)  (a,)  ()  [a, b]  {a, b}  {k: v}  {}  set()  range(a, b[, c])
"#;

const OPCODES_DOC: &str = r#"OPCODES - Supported Instructions

STACK
  NOP  EXTENDED_ARG  POP_TOP  ROT_TWO  ROT_THREE  ROT_FOUR  ROT_N n
  DUP_TOP  DUP_TOP_TWO

NAMES
  LOAD_CONST v                 Push a native value
  LOAD_FAST / LOAD_NAME / LOAD_GLOBAL / LOAD_DEREF / LOAD_CLOSURE n
                               Push the bound value, or identifier `n` if unbound
  STORE_FAST / STORE_NAME / STORE_GLOBAL / STORE_DEREF n
  DELETE_FAST / DELETE_NAME / DELETE_GLOBAL / DELETE_DEREF n
                               Fails when n was never bound

OPERATORS
  UNARY_POSITIVE UNARY_NEGATIVE UNARY_NOT UNARY_INVERT
  BINARY_* and INPLACE_* arithmetic, shift and bitwise operators
  BINARY_SUBSCR                arrayElement(c, i)
  COMPARE_OP op  IS_OP f  CONTAINS_OP f

ATTRIBUTES AND CALLS
  LOAD_ATTR n                  Statement: appends clause n; otherwise tupleElement(x, 'n')
  LOAD_METHOD n / CALL_METHOD k
  CALL_FUNCTION k  CALL_FUNCTION_KW k  CALL_FUNCTION_EX f

CONTAINERS
  BUILD_TUPLE BUILD_LIST BUILD_SET BUILD_MAP BUILD_CONST_KEY_MAP BUILD_STRING
  BUILD_TUPLE_UNPACK BUILD_TUPLE_UNPACK_WITH_CALL BUILD_LIST_UNPACK
  BUILD_SET_UNPACK BUILD_MAP_UNPACK BUILD_MAP_UNPACK_WITH_CALL
  LIST_EXTEND n  SET_UPDATE n  DICT_UPDATE n  DICT_MERGE n
                               Fold the top of stack into the container n below
  LIST_TO_TUPLE
  UNPACK_SEQUENCE n  UNPACK_EX n
  STORE_SUBSCR  DELETE_SUBSCR   Rebuild the array with arrayConcat/arraySlice
  FORMAT_VALUE f

CONTROL
  RETURN_VALUE                 Must be the last instruction replayed

REJECTED CONSTRUCTS
  Loops, iteration, branches, exception handling, with blocks, generators,
  coroutines, imports, class construction, nested functions, annotations,
  attribute assignment, comprehensions, slices and interactive printing.
  These parse, are reported by 'ckq check', and fail at compile time.
"#;

const FUNCTIONS_DOC: &str = r#"FUNCTIONS - Dialect Mapping and Host Functions

OPERATORS
  +x  negate(negate(x))      -x  negate(x)
  not x  not(x)              ~x  bitNot(x)
  a + b  plus(a, b)          a - b  minus(a, b)
  a * b  multiply(a, b)      a / b  divide(a, b)
  a // b intDiv(a, b)        a % b  modulo(a, b)
  a ** b pow(a, b)           a @ b  cast(a, b)
  a << b bitShiftLeft(a, b)  a >> b bitShiftRight(a, b)
  a & b  bitAnd(a, b)        a | b  bitOr(a, b)
  a ^ b  bitXor(a, b)        a[i]   arrayElement(a, i)

COMPARISONS
  <  less       <=  lessOrEquals   ==  equals     !=  notEquals
  >  greater    >=  greaterOrEquals
  in  in        not in  notIn
  is / is not   compare toTypeName() and value for equality

CALLS
  Calling an identifier or expression renders a call: f(x) -> `f`(x).
  Keyword arguments are only accepted by statements (as aliases) and host
  functions.

BUILTINS
  Evaluated eagerly on native values:
  len str repr int float bool abs min max sum round range list tuple set sorted

NATIVE METHODS
  str:        format join upper lower strip replace split startswith endswith
  list/tuple: count index
  dict:       get keys values items
"#;

const CLAUSES_DOC: &str = r#"CLAUSES - Statements

KEYWORDS
  select  select_distinct  insert_into  with_
    Bound before anything else. Underscores become spaces and trailing
    underscores are dropped: select_distinct -> select distinct.

CHAINING
  Attribute access appends a bare clause; a call appends a list.

    select(x, y).from_(t).where_(c)
      -> select `x`, `y` from `t` where `c`

    select(total=x + 1)
      -> select plus(`x`, 1) as `total`

CONSTRAINTS
  A list clause must follow a keyword or a bare clause. Two lists in a row
  (select(a)(b)) are rejected.

EXPRESSION POSITION
  A statement used as a value is parenthesised: (select 1).
  An expression rendered as a statement is prefixed: select plus(`x`, 1).
"#;

const VALUES_DOC: &str = r#"VALUES - Literal Rendering

  None            null
  True / False    true / false
  ...             *
  42  3.5         42  3.5
  inf  nan        inf  nan
  2j              tuple(0.0, 2.0)
  "it's"          'it\'s'         backslash escapes for control characters
  b'\x00'         '\0'            bytes outside ASCII escape as \xHH
  [1, 2]  {1, 2}  array(1, 2)
  (1, 2)          tuple(1, 2)
  {'a': 1}        array(tuple('a', 1))
  range(0, 3)     range(0, 3, 1)

IDENTIFIERS
  Unbound names render in backticks with the same escaping: `my table`.

FUNCTIONS
  Template functions render as lambda(tuple('x'), body). Builtins have no
  literal form.

Set and map members render in insertion order, which is not guaranteed.
"#;

const ERRORS_DOC: &str = r#"ERRORS - Error Kinds

PARSE
  Unexpected token, unknown mnemonic, invalid header or literal. Reported with
  line and column.

COMPILE
  unsupported        A rejected construct was replayed
  keyword call       Keyword arguments passed to a symbolic callee
  type               Operation on the wrong kind of value (unpacking, format specs)
  stack underflow    An instruction popped more than the stack held
  stack contract     Values left on the stack at RETURN_VALUE
  missing return     The trace ended without RETURN_VALUE
  unbound            DELETE of a name that was never bound
  call               A host function raised an error
  bind               Arguments did not match the template's parameters

RENDER
  Two list clauses chained directly, or a builtin function placed in the query.
"#;
