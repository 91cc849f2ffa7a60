use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct Program {
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Empty,
    Expression(Expression),
    Block(Vec<Statement>),
    Variable(VariableDeclaration),
    If(IfStatement),
    While(WhileStatement),
    DoWhile(DoWhileStatement),
    For(ForStatement),
    ForIn(ForInStatement),
    ForOf(ForOfStatement),
    Return(Option<Expression>),
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Expression),
    Try(TryStatement),
    Switch(SwitchStatement),
    Labeled(String, Box<Statement>),
    With(Expression, Box<Statement>),
    Debugger,
    FunctionDeclaration(Rc<FunctionNode>),
    ClassDeclaration(Rc<ClassNode>),
}

impl Statement {
    /// ESTree-style node name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Empty => "EmptyStatement",
            Statement::Expression(_) => "ExpressionStatement",
            Statement::Block(_) => "BlockStatement",
            Statement::Variable(_) => "VariableDeclaration",
            Statement::If(_) => "IfStatement",
            Statement::While(_) => "WhileStatement",
            Statement::DoWhile(_) => "DoWhileStatement",
            Statement::For(_) => "ForStatement",
            Statement::ForIn(_) => "ForInStatement",
            Statement::ForOf(_) => "ForOfStatement",
            Statement::Return(_) => "ReturnStatement",
            Statement::Break(_) => "BreakStatement",
            Statement::Continue(_) => "ContinueStatement",
            Statement::Throw(_) => "ThrowStatement",
            Statement::Try(_) => "TryStatement",
            Statement::Switch(_) => "SwitchStatement",
            Statement::Labeled(..) => "LabeledStatement",
            Statement::With(..) => "WithStatement",
            Statement::Debugger => "DebuggerStatement",
            Statement::FunctionDeclaration(_) => "FunctionDeclaration",
            Statement::ClassDeclaration(_) => "ClassDeclaration",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Clone, Debug)]
pub struct VariableDeclaration {
    pub kind: VarKind,
    pub declarations: Vec<VariableDeclarator>,
}

#[derive(Clone, Debug)]
pub struct VariableDeclarator {
    pub pattern: Pattern,
    pub init: Option<Expression>,
}

/// Binding targets. Only `Identifier`, `Assign` (a default) and `Rest` are
/// evaluated; `Array`/`Object` destructuring is recognized but rejected.
#[derive(Clone, Debug)]
pub enum Pattern {
    Identifier(String),
    Assign(Box<Pattern>, Box<Expression>),
    Rest(Box<Pattern>),
    Array(Vec<Option<Pattern>>),
    Object(Vec<(PropertyKey, Pattern)>),
}

impl Pattern {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Pattern::Identifier(_) => "Identifier",
            Pattern::Assign(..) => "AssignmentPattern",
            Pattern::Rest(_) => "RestElement",
            Pattern::Array(_) => "ArrayPattern",
            Pattern::Object(_) => "ObjectPattern",
        }
    }
}

#[derive(Clone, Debug)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

#[derive(Clone, Debug)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct DoWhileStatement {
    pub body: Box<Statement>,
    pub test: Expression,
}

#[derive(Clone, Debug)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub enum ForInit {
    Variable(VariableDeclaration),
    Expression(Expression),
}

/// Left side of `for-in` / `for-of`.
#[derive(Clone, Debug)]
pub enum ForHead {
    Declaration(VarKind, Pattern),
    Target(Expression),
}

#[derive(Clone, Debug)]
pub struct ForInStatement {
    pub left: ForHead,
    pub right: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct ForOfStatement {
    pub left: ForHead,
    pub right: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct TryStatement {
    pub block: Vec<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Statement>>,
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub test: Option<Expression>,
    pub consequent: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    This,
    Super,
    Array(Vec<Option<Expression>>),
    Object(Vec<Property>),
    Function(Rc<FunctionNode>),
    ArrowFunction(Rc<FunctionNode>),
    Class(Rc<ClassNode>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    Update(UpdateOp, bool, Box<Expression>),
    Assign(AssignOp, Box<Expression>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    Call(Box<Expression>, Vec<Expression>),
    New(Box<Expression>, Vec<Expression>),
    Member(Box<Expression>, MemberProperty),
    OptionalChain(Box<Expression>, Box<Expression>),
    Spread(Box<Expression>),
    Template(TemplateLiteral),
    TaggedTemplate(Box<Expression>, TemplateLiteral),
    Typeof(Box<Expression>),
    Void(Box<Expression>),
    Delete(Box<Expression>),
    Await(Box<Expression>),
    Yield(Option<Box<Expression>>, bool),
    Sequence(Vec<Expression>),
    NewTarget,
}

impl Expression {
    /// ESTree-style node name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Literal(Literal::RegExp(..)) => "RegExpLiteral",
            Expression::Literal(_) => "Literal",
            Expression::Identifier(_) => "Identifier",
            Expression::This => "ThisExpression",
            Expression::Super => "Super",
            Expression::Array(_) => "ArrayExpression",
            Expression::Object(_) => "ObjectExpression",
            Expression::Function(_) => "FunctionExpression",
            Expression::ArrowFunction(_) => "ArrowFunctionExpression",
            Expression::Class(_) => "ClassExpression",
            Expression::Unary(..) | Expression::Typeof(_) | Expression::Void(_) | Expression::Delete(_) => {
                "UnaryExpression"
            }
            Expression::Binary(..) => "BinaryExpression",
            Expression::Logical(..) => "LogicalExpression",
            Expression::Update(..) => "UpdateExpression",
            Expression::Assign(..) => "AssignmentExpression",
            Expression::Conditional(..) => "ConditionalExpression",
            Expression::Call(..) => "CallExpression",
            Expression::New(..) => "NewExpression",
            Expression::Member(..) => "MemberExpression",
            Expression::OptionalChain(..) => "ChainExpression",
            Expression::Spread(_) => "SpreadElement",
            Expression::Template(_) => "TemplateLiteral",
            Expression::TaggedTemplate(..) => "TaggedTemplateExpression",
            Expression::Await(_) => "AwaitExpression",
            Expression::Yield(..) => "YieldExpression",
            Expression::Sequence(_) => "SequenceExpression",
            Expression::NewTarget => "MetaProperty",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    BigInt(String),
    RegExp(String, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LShift,
    RShift,
    URShift,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    NullishCoalescing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ExpAssign,
    LShiftAssign,
    RShiftAssign,
    URShiftAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    LogicalAndAssign,
    LogicalOrAssign,
    NullishAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, if any.
    pub fn binary_op(self) -> Option<BinaryOp> {
        Some(match self {
            AssignOp::AddAssign => BinaryOp::Add,
            AssignOp::SubAssign => BinaryOp::Sub,
            AssignOp::MulAssign => BinaryOp::Mul,
            AssignOp::DivAssign => BinaryOp::Div,
            AssignOp::ModAssign => BinaryOp::Mod,
            AssignOp::ExpAssign => BinaryOp::Exp,
            AssignOp::LShiftAssign => BinaryOp::LShift,
            AssignOp::RShiftAssign => BinaryOp::RShift,
            AssignOp::URShiftAssign => BinaryOp::URShift,
            AssignOp::BitAndAssign => BinaryOp::BitAnd,
            AssignOp::BitOrAssign => BinaryOp::BitOr,
            AssignOp::BitXorAssign => BinaryOp::BitXor,
            AssignOp::Assign
            | AssignOp::LogicalAndAssign
            | AssignOp::LogicalOrAssign
            | AssignOp::NullishAssign => return None,
        })
    }
}

#[derive(Clone, Debug)]
pub enum MemberProperty {
    Dot(String),
    Computed(Box<Expression>),
}

#[derive(Clone, Debug)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expression,
    pub kind: PropertyKind,
    pub shorthand: bool,
}

#[derive(Clone, Debug)]
pub enum PropertyKey {
    Identifier(String),
    String(String),
    Number(f64),
    Computed(Box<Expression>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Init,
    Method,
    Get,
    Set,
    Spread,
}

#[derive(Clone, Debug)]
pub struct TemplateLiteral {
    pub quasis: Vec<Option<String>>,
    pub expressions: Vec<Expression>,
}

#[derive(Clone, Debug)]
pub enum FunctionBody {
    Block(Vec<Statement>),
    Expression(Box<Expression>),
}

/// Shared by declarations, expressions, arrows, methods and constructors.
#[derive(Clone, Debug)]
pub struct FunctionNode {
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub is_async: bool,
    pub is_generator: bool,
}

impl FunctionNode {
    /// Number of parameters before the first default or rest.
    pub fn expected_argument_count(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| matches!(p, Pattern::Identifier(_)))
            .count()
    }
}

#[derive(Clone, Debug)]
pub struct ClassNode {
    pub name: Option<String>,
    pub super_class: Option<Box<Expression>>,
    pub body: Vec<ClassElement>,
}

impl ClassNode {
    pub fn constructor(&self) -> Option<&Rc<FunctionNode>> {
        self.body.iter().find_map(|element| match element {
            ClassElement::Method(m) if m.kind == ClassMethodKind::Constructor => Some(&m.value),
            _ => None,
        })
    }
}

#[derive(Clone, Debug)]
pub enum ClassElement {
    Method(ClassMethod),
    Field(ClassField),
    StaticBlock(Vec<Statement>),
}

#[derive(Clone, Debug)]
pub struct ClassMethod {
    pub key: PropertyKey,
    pub kind: ClassMethodKind,
    pub value: Rc<FunctionNode>,
    pub is_static: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassMethodKind {
    Method,
    Get,
    Set,
    Constructor,
}

#[derive(Clone, Debug)]
pub struct ClassField {
    pub key: PropertyKey,
    pub value: Option<Rc<Expression>>,
    pub is_static: bool,
}
