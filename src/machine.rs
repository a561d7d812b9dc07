//! Symbolic replay of an instruction trace.
//!
//! The machine runs the trace against an operand stack of [`Node`]s instead
//! of runtime values. Arithmetic, comparisons and attribute access build
//! dialect calls; free names surface as column identifiers; statements grow
//! clause by clause; calls on host functions run eagerly.

use std::collections::HashMap;

use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{Expression, Node, RenderError, statements::keywords},
    builtins::builtins,
    function::CallError,
    instruction::{Construct, Container, Conversion, Instruction, Merge},
    methods,
    template::BindError,
    value::{SizeError, Value},
};

/// Errors raised while compiling a template.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Control flow and friends: the trace is not straight-line code
    #[error("unsupported construct ({construct}): {mnemonic} at offset {offset}")]
    Unsupported {
        offset: usize,
        mnemonic: String,
        construct: Construct,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Keyword arguments passed to a dialect function
    #[error("keyword arguments cannot be passed to {callee} (offset {offset})")]
    KeywordCall { offset: usize, callee: String },

    #[error("type error at offset {offset}: {message}")]
    Type { offset: usize, message: String },

    #[error("stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },

    /// Return found more than one value on the stack
    #[error("{remaining} value(s) left on the stack after return")]
    StackContract { remaining: usize },

    #[error("instruction trace ends without a return")]
    MissingReturn,

    #[error("name '{name}' is not defined (offset {offset})")]
    UnboundName { offset: usize, name: String },

    /// A host function failed while running eagerly
    #[error("{function}() failed at offset {offset}: {source}")]
    Call {
        offset: usize,
        function: String,
        source: CallError,
    },

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Seeds a context: statement keywords, then builtins, then each layer in turn.
pub fn initial_context<I>(layers: I) -> HashMap<String, Node>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut context = HashMap::new();
    for (name, statement) in keywords() {
        context.insert(name.to_string(), Node::Statement(statement));
    }
    for (name, function) in builtins() {
        context.insert(name.to_string(), Node::from(Value::Function(function)));
    }
    for (name, value) in layers {
        context.insert(name, Node::from(value));
    }
    context
}

enum Step {
    Continue,
    Return(Node),
}

pub struct Machine<'a> {
    code: &'a [Instruction],
    stack: Vec<Node>,
    context: HashMap<String, Node>,
    offset: usize,
}

impl<'a> Machine<'a> {
    pub fn new(code: &'a [Instruction], context: HashMap<String, Node>) -> Self {
        Machine {
            code,
            stack: Vec::new(),
            context,
            offset: 0,
        }
    }

    /// Replays the trace up to its return.
    pub fn run(mut self) -> Result<Node, CompileError> {
        let code = self.code;
        for (offset, instruction) in code.iter().enumerate() {
            self.offset = offset;
            trace!(offset, instruction = %instruction, depth = self.stack.len(), "replay");

            if let Step::Return(result) = self.execute(instruction)? {
                if !self.stack.is_empty() {
                    return Err(CompileError::StackContract {
                        remaining: self.stack.len(),
                    });
                }
                return Ok(result);
            }
        }
        Err(CompileError::MissingReturn)
    }

    fn type_error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Type {
            offset: self.offset,
            message: message.into(),
        }
    }

    fn push(&mut self, node: impl Into<Node>) {
        self.stack.push(node.into());
    }

    fn pop(&mut self) -> Result<Node, CompileError> {
        self.stack
            .pop()
            .ok_or(CompileError::StackUnderflow { offset: self.offset })
    }

    /// Pops `count` operands, returned bottom first.
    fn pop_n(&mut self, count: usize) -> Result<Vec<Node>, CompileError> {
        let Some(split) = self.stack.len().checked_sub(count) else {
            return Err(CompileError::StackUnderflow { offset: self.offset });
        };
        Ok(self.stack.split_off(split))
    }

    /// Moves the top of the stack down to position `depth`.
    fn rotate(&mut self, depth: usize) -> Result<(), CompileError> {
        if depth < 2 {
            return Ok(());
        }
        let Some(target) = self.stack.len().checked_sub(depth) else {
            return Err(CompileError::StackUnderflow { offset: self.offset });
        };
        let top = self.pop()?;
        self.stack.insert(target, top);
        Ok(())
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<Step, CompileError> {
        match instruction {
            Instruction::Nop | Instruction::ExtendedArg(_) => {}
            Instruction::PopTop => {
                self.pop()?;
            }
            Instruction::RotTwo => self.rotate(2)?,
            Instruction::RotThree => self.rotate(3)?,
            Instruction::RotFour => self.rotate(4)?,
            Instruction::RotN(depth) => self.rotate(*depth)?,
            Instruction::DupTop => {
                let top = self.pop()?;
                self.push(top.clone());
                self.push(top);
            }
            Instruction::DupTopTwo => {
                let pair = self.pop_n(2)?;
                self.stack.extend(pair.iter().cloned());
                self.stack.extend(pair);
            }

            Instruction::Unary(op) => {
                let operand = self.pop()?;
                self.push(op.apply(operand));
            }
            Instruction::Binary(op) => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(op.apply(lhs, rhs));
            }
            Instruction::Compare(op) => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(op.apply(lhs, rhs));
            }
            Instruction::StoreSubscript => {
                let index = self.pop()?;
                let container = self.pop()?;
                let value = self.pop()?;
                let lowered = splice(container.clone(), index, Some(value));
                self.rebind(&container, lowered);
            }
            Instruction::DeleteSubscript => {
                let index = self.pop()?;
                let container = self.pop()?;
                let lowered = splice(container.clone(), index, None);
                self.rebind(&container, lowered);
            }

            Instruction::LoadConst(value) => self.push(value.clone()),
            Instruction::Load(_, name) => {
                let node = match self.context.get(name) {
                    Some(node) => node.clone(),
                    None => Node::identifier(name.as_str()),
                };
                self.push(node);
            }
            Instruction::Store(_, name) => {
                let value = self.pop()?;
                self.context.insert(name.clone(), value);
            }
            Instruction::Delete(_, name) => {
                if self.context.remove(name).is_none() {
                    return Err(CompileError::UnboundName {
                        offset: self.offset,
                        name: name.clone(),
                    });
                }
            }
            Instruction::LoadAttr(name) => {
                let receiver = self.pop()?;
                self.push(receiver.attr(name));
            }
            Instruction::LoadMethod(name) => self.load_method(name)?,

            Instruction::Build(container, count) => {
                let built = self.build(*container, *count)?;
                self.push(built);
            }
            Instruction::Merge(merge, depth) => self.merge_into(*merge, *depth)?,
            Instruction::ListToTuple => {
                let list = self.pop()?;
                let items = self.native_members(list)?;
                self.push(Value::Tuple(items));
            }
            Instruction::UnpackSequence(count) => self.unpack_sequence(*count)?,
            Instruction::UnpackEx { before, after } => self.unpack_ex(*before, *after)?,

            Instruction::CallFunction(argc) => {
                let args = self.pop_n(*argc)?;
                let callee = self.pop()?;
                let result = self.call(callee, args, Vec::new())?;
                self.push(result);
            }
            Instruction::CallFunctionKw(argc) => {
                let names = self.keyword_names(*argc)?;
                let mut args = self.pop_n(*argc)?;
                let values = args.split_off(args.len() - names.len());
                let callee = self.pop()?;
                let result = self.call(callee, args, names.into_iter().zip(values).collect())?;
                self.push(result);
            }
            Instruction::CallFunctionEx { keywords } => {
                let kwargs = if *keywords {
                    let mapping = self.pop()?;
                    self.keyword_mapping(mapping)?
                } else {
                    Vec::new()
                };
                let sequence = self.pop()?;
                let args = self.native_members(sequence)?.into_iter().map(Node::from).collect();
                let callee = self.pop()?;
                let result = self.call(callee, args, kwargs)?;
                self.push(result);
            }
            Instruction::CallMethod(argc) => {
                let args = self.pop_n(*argc)?;
                self.pop()?; // receiver slot
                let callee = self.pop()?;
                let result = self.call(callee, args, Vec::new())?;
                self.push(result);
            }

            Instruction::FormatValue {
                conversion,
                with_spec,
            } => self.format_value(*conversion, *with_spec)?,

            Instruction::ReturnValue => return Ok(Step::Return(self.pop()?)),

            Instruction::Unsupported {
                mnemonic,
                construct,
            } => {
                return Err(CompileError::Unsupported {
                    offset: self.offset,
                    mnemonic: mnemonic.clone(),
                    construct: *construct,
                });
            }
        }
        Ok(Step::Continue)
    }

    /// Rebinds every name holding `container` to the lowered value.
    fn rebind(&mut self, container: &Node, lowered: Node) {
        let mut bound = false;
        for node in self.context.values_mut() {
            if node == container {
                *node = lowered.clone();
                bound = true;
            }
        }
        if bound {
            return;
        }
        match container {
            Node::Expression(Expression::Identifier(name)) => {
                self.context.insert(name.clone(), lowered);
            }
            _ => trace!(offset = self.offset, "subscript store on an unnamed value dropped"),
        }
    }

    /// Statements open a clause; native values bind a host method; anything
    /// else calls the attribute-access result.
    fn load_method(&mut self, name: &str) -> Result<(), CompileError> {
        let receiver = self.pop()?;
        let callee = match &receiver {
            Node::Statement(statement) => Node::Statement(statement.clone().clause(name)),
            Node::Expression(Expression::Value(value)) => match methods::bind(value, name) {
                Some(method) => Node::from(Value::Function(method)),
                None => receiver.clone().attr(name),
            },
            _ => receiver.clone().attr(name),
        };
        self.push(callee);
        self.push(receiver);
        Ok(())
    }

    fn call(
        &self,
        callee: Node,
        args: Vec<Node>,
        kwargs: Vec<(String, Node)>,
    ) -> Result<Node, CompileError> {
        match callee {
            Node::Statement(statement) => Ok(Node::Statement(statement.list_with_aliases(args, kwargs)?)),
            Node::Expression(Expression::Value(Value::Function(function))) => {
                let args = args.into_iter().map(Value::from).collect();
                let kwargs = kwargs
                    .into_iter()
                    .map(|(name, value)| (name, Value::from(value)))
                    .collect();
                let result = function.call(args, kwargs).map_err(|source| CompileError::Call {
                    offset: self.offset,
                    function: function.name().to_string(),
                    source,
                })?;
                Ok(Node::from(result))
            }
            Node::Expression(Expression::Value(other)) => Err(self.type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
            callee => {
                if !kwargs.is_empty() {
                    return Err(CompileError::KeywordCall {
                        offset: self.offset,
                        callee: callee.render_expression()?,
                    });
                }
                Ok(Node::Expression(Expression::invoke(callee, args)))
            }
        }
    }

    /// The names tuple `CALL_FUNCTION_KW` keeps on top of the stack.
    fn keyword_names(&mut self, argc: usize) -> Result<Vec<String>, CompileError> {
        let names = Value::from(self.pop()?);
        let Value::Tuple(names) = names else {
            return Err(self.type_error(format!(
                "keyword names must be a tuple, not '{}'",
                names.type_name()
            )));
        };
        if names.len() > argc {
            return Err(self.type_error(format!(
                "{} keyword names for {argc} argument(s)",
                names.len()
            )));
        }
        names
            .into_iter()
            .map(|name| match name {
                Value::Text(name) => Ok(name),
                other => Err(self.type_error(format!(
                    "keywords must be strings, not '{}'",
                    other.type_name()
                ))),
            })
            .collect()
    }

    fn keyword_mapping(&self, mapping: Node) -> Result<Vec<(String, Node)>, CompileError> {
        match Value::from(mapping) {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| match key {
                    Value::Text(name) => Ok((name, Node::from(value))),
                    other => Err(self.type_error(format!(
                        "keywords must be strings, not '{}'",
                        other.type_name()
                    ))),
                })
                .collect(),
            other => Err(self.type_error(format!(
                "argument after ** must be a mapping, not '{}'",
                other.type_name()
            ))),
        }
    }

    /// Members of a native iterable; symbolic values cannot be spread.
    fn native_members(&self, node: Node) -> Result<Vec<Value>, CompileError> {
        let value = Value::from(node);
        value.iterate().map_err(|e| match e {
            SizeError::Unsized(type_name) => {
                self.type_error(format!("'{type_name}' object is not iterable"))
            }
            SizeError::TooLarge => self.type_error(e.to_string()),
        })
    }

    fn native_entries(&self, node: Node) -> Result<Vec<(Value, Value)>, CompileError> {
        match Value::from(node) {
            Value::Map(entries) => Ok(entries),
            other => Err(self.type_error(format!(
                "'{}' object is not a mapping",
                other.type_name()
            ))),
        }
    }

    fn build(&mut self, container: Container, count: usize) -> Result<Node, CompileError> {
        let value = match container {
            Container::Tuple => Value::Tuple(unbox(self.pop_n(count)?)),
            Container::List => Value::List(unbox(self.pop_n(count)?)),
            Container::Set => Value::set(unbox(self.pop_n(count)?)),
            Container::Map => {
                let mut operands = unbox(self.pop_n(count * 2)?).into_iter();
                let mut pairs = Vec::with_capacity(count);
                while let (Some(key), Some(value)) = (operands.next(), operands.next()) {
                    pairs.push((key, value));
                }
                Value::map(pairs)
            }
            Container::ConstKeyMap => {
                let keys = self.pop()?;
                let keys = self.native_members(keys)?;
                if keys.len() != count {
                    return Err(self.type_error(format!(
                        "{} keys for {count} value(s)",
                        keys.len()
                    )));
                }
                let values = unbox(self.pop_n(count)?);
                Value::map(keys.into_iter().zip(values))
            }
            Container::String => return Ok(concat(self.pop_n(count)?)),
            Container::TupleUnpack | Container::TupleUnpackWithCall => {
                Value::Tuple(self.merge(count)?)
            }
            Container::ListUnpack => Value::List(self.merge(count)?),
            Container::SetUnpack => Value::set(self.merge(count)?),
            Container::MapUnpack | Container::MapUnpackWithCall => {
                let mut entries = Vec::new();
                for operand in self.pop_n(count)? {
                    entries.extend(self.native_entries(operand)?);
                }
                Value::map(entries)
            }
        };
        Ok(Node::from(value))
    }

    fn merge(&mut self, count: usize) -> Result<Vec<Value>, CompileError> {
        let mut items = Vec::new();
        for operand in self.pop_n(count)? {
            items.extend(self.native_members(operand)?);
        }
        Ok(items)
    }

    /// Folds the top of the stack into the native container `depth` slots
    /// below it, leaving that container in place.
    fn merge_into(&mut self, merge: Merge, depth: usize) -> Result<(), CompileError> {
        let operand = self.pop()?;
        let Some(slot) = self.stack.len().checked_sub(depth).filter(|_| depth > 0) else {
            return Err(CompileError::StackUnderflow { offset: self.offset });
        };

        let merged = match (merge, Value::from(self.stack[slot].clone())) {
            (Merge::ListExtend, Value::List(mut items)) => {
                items.extend(self.native_members(operand)?);
                Value::List(items)
            }
            (Merge::SetUpdate, Value::Set(members)) => {
                Value::set(members.into_iter().chain(self.native_members(operand)?))
            }
            (Merge::DictUpdate | Merge::DictMerge, Value::Map(mut entries)) => {
                let incoming = self.native_entries(operand)?;
                if merge == Merge::DictMerge {
                    let repeated = incoming
                        .iter()
                        .find(|(key, _)| entries.iter().any(|(existing, _)| existing == key));
                    if let Some((key, _)) = repeated {
                        return Err(self.type_error(format!(
                            "got multiple values for keyword argument {}",
                            key.repr()
                        )));
                    }
                }
                entries.extend(incoming);
                Value::map(entries)
            }
            (_, other) => {
                return Err(self.type_error(format!(
                    "{} cannot merge into '{}' object",
                    merge.mnemonic(),
                    other.type_name()
                )));
            }
        };
        self.stack[slot] = Node::from(merged);
        Ok(())
    }

    fn unpack_sequence(&mut self, count: usize) -> Result<(), CompileError> {
        let node = self.pop()?;
        let value = Value::from(node.clone());

        if let Value::Node(_) = value {
            for index in (1..=count).rev() {
                self.push(Expression::call(
                    "tupleElement",
                    [node.clone(), Node::from(index as i64)],
                ));
            }
            return Ok(());
        }

        let items = value.iterate().map_err(|e| match e {
            SizeError::Unsized(type_name) => {
                self.type_error(format!("cannot unpack non-iterable {type_name} object"))
            }
            SizeError::TooLarge => self.type_error(e.to_string()),
        })?;
        if items.len() != count {
            return Err(self.type_error(format!(
                "expected {count} value(s) to unpack, got {}",
                items.len()
            )));
        }
        for item in items.into_iter().rev() {
            self.push(item);
        }
        Ok(())
    }

    fn unpack_ex(&mut self, before: usize, after: usize) -> Result<(), CompileError> {
        let node = self.pop()?;
        let mut items = self.native_members(node)?;
        if items.len() < before + after {
            return Err(self.type_error(format!(
                "expected at least {} value(s) to unpack, got {}",
                before + after,
                items.len()
            )));
        }

        let tail = items.split_off(items.len() - after);
        let middle = items.split_off(before);
        for item in tail.into_iter().rev() {
            self.push(item);
        }
        self.push(Value::List(middle));
        for item in items.into_iter().rev() {
            self.push(item);
        }
        Ok(())
    }

    fn format_value(&mut self, conversion: Conversion, with_spec: bool) -> Result<(), CompileError> {
        if with_spec {
            match Value::from(self.pop()?) {
                Value::Text(spec) if spec.is_empty() => {}
                spec => {
                    return Err(self.type_error(format!(
                        "format spec {} is not supported",
                        spec.repr()
                    )));
                }
            }
        }

        let node = self.pop()?;
        let formatted = match Value::from(node.clone()) {
            Value::Node(_) => Node::from(Expression::call("toString", [node])),
            value => Node::from(match conversion {
                Conversion::None | Conversion::Str => value.to_text(),
                Conversion::Repr => value.repr(),
                Conversion::Ascii => ascii(&value.repr()),
            }),
        };
        self.push(formatted);
        Ok(())
    }
}

fn unbox(nodes: Vec<Node>) -> Vec<Value> {
    nodes.into_iter().map(Value::from).collect()
}

/// `c[i] = v` as `arrayConcat(prefix, array(v), suffix)`; deletion drops the middle.
fn splice(container: Node, index: Node, value: Option<Node>) -> Node {
    let before = Expression::call("minus", [index.clone(), Node::from(1)]);
    let after = Expression::call("plus", [index, Node::from(1)]);

    let mut parts = vec![Node::from(Expression::call(
        "arraySlice",
        [container.clone(), Node::from(1), Node::from(before)],
    ))];
    if let Some(value) = value {
        parts.push(Node::from(Expression::call("array", [value])));
    }
    parts.push(Node::from(Expression::call(
        "arraySlice",
        [container, Node::from(after)],
    )));
    Node::from(Expression::call("arrayConcat", parts))
}

/// Joined text when every part is native text, `concat(parts...)` otherwise.
fn concat(parts: Vec<Node>) -> Node {
    let native = parts
        .iter()
        .map(|part| match part {
            Node::Expression(Expression::Value(Value::Text(piece))) => Some(piece.as_str()),
            _ => None,
        })
        .collect::<Option<String>>();
    match native {
        Some(text) => Node::from(text),
        None => Node::from(Expression::call("concat", parts)),
    }
}

fn ascii(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch as u32 {
            0..=0x7f => result.push(ch),
            code @ 0x80..=0xff => result.push_str(&format!("\\x{code:02x}")),
            code @ 0x100..=0xffff => result.push_str(&format!("\\u{code:04x}")),
            code => result.push_str(&format!("\\U{code:08x}")),
        }
    }
    result
}
