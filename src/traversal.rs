//! Generic pre-order walk/find/transform over the AST, generalizing the
//! per-variant child enumeration every node family needs.

use crate::ast::*;
use crate::span::Span;
use std::future::Future;

/// A borrowed reference to any node family reachable from a [`Program`].
#[derive(Debug, Clone, Copy)]
pub enum Node<'ast> {
    Program(&'ast Program<'ast>),
    Stmt(StmtId<'ast>),
    Expr(ExprId<'ast>),
    ClassMember(&'ast ClassMember<'ast>),
    Param(&'ast Param<'ast>),
    Arg(&'ast Arg<'ast>),
    ArrayItem(&'ast ArrayItem<'ast>),
    Case(&'ast Case<'ast>),
    Catch(&'ast Catch<'ast>),
    MatchArm(&'ast MatchArm<'ast>),
    Type(&'ast Type<'ast>),
    Name(&'ast Name<'ast>),
    UseItem(&'ast UseItem<'ast>),
    TraitAdaptation(&'ast TraitAdaptation<'ast>),
    AttributeGroup(&'ast AttributeGroup<'ast>),
    Attribute(&'ast Attribute<'ast>),
    DeclareItem(&'ast DeclareItem<'ast>),
    StaticVar(&'ast StaticVar<'ast>),
    ClosureUse(&'ast ClosureUse<'ast>),
    PropertyEntry(&'ast PropertyEntry<'ast>),
    ClassConst(&'ast ClassConst<'ast>),
}

impl<'ast> Node<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Node::Program(p) => p.span,
            Node::Stmt(s) => s.span(),
            Node::Expr(e) => e.span(),
            Node::ClassMember(m) => class_member_span(m),
            Node::Param(p) => p.span,
            Node::Arg(a) => a.span,
            Node::ArrayItem(a) => a.span,
            Node::Case(c) => c.span,
            Node::Catch(c) => c.span,
            Node::MatchArm(a) => a.span,
            Node::Type(t) => type_span(t),
            Node::Name(n) => n.span,
            Node::UseItem(u) => u.span,
            Node::TraitAdaptation(t) => match t {
                TraitAdaptation::Precedence { span, .. } => *span,
                TraitAdaptation::Alias { span, .. } => *span,
            },
            Node::AttributeGroup(g) => g.span,
            Node::Attribute(a) => a.span,
            Node::DeclareItem(d) => d.span,
            Node::StaticVar(s) => s.span,
            Node::ClosureUse(c) => c.span,
            Node::PropertyEntry(p) => p.span,
            Node::ClassConst(c) => c.span,
        }
    }

    /// Direct children, in source order.
    pub fn children(&self) -> Vec<Node<'ast>> {
        match self {
            Node::Program(p) => p.statements.iter().copied().map(Node::Stmt).collect(),
            Node::Stmt(s) => stmt_children(*s),
            Node::Expr(e) => expr_children(*e),
            Node::ClassMember(m) => class_member_children(*m),
            Node::Param(p) => {
                let mut out: Vec<Node<'ast>> =
                    p.attributes.iter().map(Node::AttributeGroup).collect();
                if let Some(ty) = p.ty {
                    out.push(Node::Type(ty));
                }
                if let Some(d) = p.default {
                    out.push(Node::Expr(d));
                }
                out
            }
            Node::Arg(a) => vec![Node::Expr(a.value)],
            Node::ArrayItem(a) => {
                let mut out = Vec::new();
                if let Some(k) = a.key {
                    out.push(Node::Expr(k));
                }
                out.push(Node::Expr(a.value));
                out
            }
            Node::Case(c) => {
                let mut out = Vec::new();
                if let Some(cond) = c.condition {
                    out.push(Node::Expr(cond));
                }
                out.extend(c.body.iter().copied().map(Node::Stmt));
                out
            }
            Node::Catch(c) => {
                let mut out: Vec<Node<'ast>> = c.types.iter().map(Node::Name).collect();
                out.extend(c.body.iter().copied().map(Node::Stmt));
                out
            }
            Node::MatchArm(a) => {
                let mut out: Vec<Node<'ast>> = a
                    .conditions
                    .map(|cs| cs.iter().copied().map(Node::Expr).collect())
                    .unwrap_or_default();
                out.push(Node::Expr(a.body));
                out
            }
            Node::Type(t) => type_children(*t),
            Node::Name(_) => Vec::new(),
            Node::UseItem(u) => vec![Node::Name(&u.name)],
            Node::TraitAdaptation(t) => match t {
                TraitAdaptation::Precedence { insteadof, .. } => {
                    insteadof.iter().map(Node::Name).collect()
                }
                TraitAdaptation::Alias { .. } => Vec::new(),
            },
            Node::AttributeGroup(g) => g.attributes.iter().map(Node::Attribute).collect(),
            Node::Attribute(a) => {
                let mut out = vec![Node::Name(&a.name)];
                out.extend(a.args.iter().map(Node::Arg));
                out
            }
            Node::DeclareItem(d) => vec![Node::Expr(d.value)],
            Node::StaticVar(s) => {
                let mut out = vec![Node::Expr(s.var)];
                if let Some(d) = s.default {
                    out.push(Node::Expr(d));
                }
                out
            }
            Node::ClosureUse(_) => Vec::new(),
            Node::PropertyEntry(p) => p.default.map(|d| vec![Node::Expr(d)]).unwrap_or_default(),
            Node::ClassConst(c) => vec![Node::Expr(c.value)],
        }
    }

    pub fn is_statement(&self) -> bool {
        matches!(self, Node::Stmt(_))
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Node::Expr(_))
    }

    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Node::Stmt(Stmt::Function { .. })
                | Node::Stmt(Stmt::Class { .. })
                | Node::Stmt(Stmt::Interface { .. })
                | Node::Stmt(Stmt::Trait { .. })
                | Node::Stmt(Stmt::Enum { .. })
                | Node::Stmt(Stmt::Namespace { .. })
                | Node::Stmt(Stmt::Use { .. })
                | Node::ClassMember(ClassMember::Method { .. })
                | Node::ClassMember(ClassMember::Property { .. })
                | Node::ClassMember(ClassMember::Const { .. })
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Node::Expr(Expr::Integer { .. })
                | Node::Expr(Expr::Float { .. })
                | Node::Expr(Expr::Boolean { .. })
                | Node::Expr(Expr::Null { .. })
                | Node::Expr(Expr::String { .. })
                | Node::Expr(Expr::TemplateString { .. })
                | Node::Expr(Expr::Array { .. })
        )
    }
}

fn class_member_span(m: &ClassMember) -> Span {
    match m {
        ClassMember::Property { span, .. } => *span,
        ClassMember::Method { span, .. } => *span,
        ClassMember::Const { span, .. } => *span,
        ClassMember::TraitUse { span, .. } => *span,
        ClassMember::Case { span, .. } => *span,
    }
}

fn type_span(t: &Type) -> Span {
    match t {
        Type::Simple(tok) => tok.span,
        Type::Name(n) => n.span,
        Type::Union(parts) | Type::Intersection(parts) => {
            parts.first().map(type_span).unwrap_or_default()
        }
        Type::Nullable(inner) => type_span(inner),
    }
}

fn type_children<'ast>(t: &'ast Type<'ast>) -> Vec<Node<'ast>> {
    match t {
        Type::Simple(_) => Vec::new(),
        Type::Name(n) => vec![Node::Name(n)],
        Type::Union(parts) | Type::Intersection(parts) => {
            parts.iter().map(Node::Type).collect()
        }
        Type::Nullable(inner) => vec![Node::Type(*inner)],
    }
}

fn stmt_children<'ast>(s: &'ast Stmt<'ast>) -> Vec<Node<'ast>> {
    match s {
        Stmt::Echo { exprs, .. } => exprs.iter().copied().map(Node::Expr).collect(),
        Stmt::Return { expr, .. } => expr.iter().copied().map(Node::Expr).collect(),
        Stmt::If {
            condition,
            then_block,
            else_block,
            ..
        } => {
            let mut out = vec![Node::Expr(*condition)];
            out.extend(then_block.iter().copied().map(Node::Stmt));
            if let Some(eb) = else_block {
                out.extend(eb.iter().copied().map(Node::Stmt));
            }
            out
        }
        Stmt::While {
            condition, body, ..
        } => {
            let mut out = vec![Node::Expr(*condition)];
            out.extend(body.iter().copied().map(Node::Stmt));
            out
        }
        Stmt::DoWhile {
            body, condition, ..
        } => {
            let mut out: Vec<Node<'ast>> = body.iter().copied().map(Node::Stmt).collect();
            out.push(Node::Expr(*condition));
            out
        }
        Stmt::For {
            init,
            condition,
            loop_expr,
            body,
            ..
        } => {
            let mut out: Vec<Node<'ast>> = init.iter().copied().map(Node::Expr).collect();
            out.extend(condition.iter().copied().map(Node::Expr));
            out.extend(loop_expr.iter().copied().map(Node::Expr));
            out.extend(body.iter().copied().map(Node::Stmt));
            out
        }
        Stmt::Foreach {
            expr,
            key_var,
            value_var,
            body,
            ..
        } => {
            let mut out = vec![Node::Expr(*expr)];
            if let Some(k) = key_var {
                out.push(Node::Expr(*k));
            }
            out.push(Node::Expr(*value_var));
            out.extend(body.iter().copied().map(Node::Stmt));
            out
        }
        Stmt::Block { statements, .. } => statements.iter().copied().map(Node::Stmt).collect(),
        Stmt::Function {
            attributes,
            params,
            return_type,
            body,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(params.iter().map(Node::Param));
            if let Some(rt) = return_type {
                out.push(Node::Type(*rt));
            }
            out.extend(body.iter().copied().map(Node::Stmt));
            out
        }
        Stmt::Class {
            attributes,
            extends,
            implements,
            members,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            if let Some(e) = extends {
                out.push(Node::Name(e));
            }
            out.extend(implements.iter().map(Node::Name));
            out.extend(members.iter().map(Node::ClassMember));
            out
        }
        Stmt::Interface {
            attributes,
            extends,
            members,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(extends.iter().map(Node::Name));
            out.extend(members.iter().map(Node::ClassMember));
            out
        }
        Stmt::Trait {
            attributes,
            members,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(members.iter().map(Node::ClassMember));
            out
        }
        Stmt::Enum {
            attributes,
            backed_type,
            implements,
            members,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            if let Some(bt) = backed_type {
                out.push(Node::Type(*bt));
            }
            out.extend(implements.iter().map(Node::Name));
            out.extend(members.iter().map(Node::ClassMember));
            out
        }
        Stmt::Namespace { name, body, .. } => {
            let mut out: Vec<Node<'ast>> = name.iter().map(Node::Name).collect();
            if let Some(b) = body {
                out.extend(b.iter().copied().map(Node::Stmt));
            }
            out
        }
        Stmt::Use { uses, .. } => uses.iter().map(Node::UseItem).collect(),
        Stmt::Switch {
            condition, cases, ..
        } => {
            let mut out = vec![Node::Expr(*condition)];
            out.extend(cases.iter().map(Node::Case));
            out
        }
        Stmt::Try {
            body,
            catches,
            finally,
            ..
        } => {
            let mut out: Vec<Node<'ast>> = body.iter().copied().map(Node::Stmt).collect();
            out.extend(catches.iter().map(Node::Catch));
            if let Some(f) = finally {
                out.extend(f.iter().copied().map(Node::Stmt));
            }
            out
        }
        Stmt::Throw { expr, .. } => vec![Node::Expr(*expr)],
        Stmt::Const {
            attributes, consts, ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(consts.iter().map(Node::ClassConst));
            out
        }
        Stmt::Break { level, .. } | Stmt::Continue { level, .. } => {
            level.iter().copied().map(Node::Expr).collect()
        }
        Stmt::Global { vars, .. } | Stmt::Unset { vars, .. } => {
            vars.iter().copied().map(Node::Expr).collect()
        }
        Stmt::Static { vars, .. } => vars.iter().map(Node::StaticVar).collect(),
        Stmt::Expression { expr, .. } => vec![Node::Expr(*expr)],
        Stmt::Declare { declares, body, .. } => {
            let mut out: Vec<Node<'ast>> = declares.iter().map(Node::DeclareItem).collect();
            out.extend(body.iter().copied().map(Node::Stmt));
            out
        }
        Stmt::InlineHtml { .. }
        | Stmt::Nop { .. }
        | Stmt::Label { .. }
        | Stmt::Goto { .. }
        | Stmt::Error { .. } => Vec::new(),
    }
}

fn expr_children<'ast>(e: &'ast Expr<'ast>) -> Vec<Node<'ast>> {
    match e {
        Expr::Assign { var, expr, .. }
        | Expr::AssignRef { var, expr, .. } => vec![Node::Expr(*var), Node::Expr(*expr)],
        Expr::AssignOp { var, expr, .. } => vec![Node::Expr(*var), Node::Expr(*expr)],
        Expr::Binary { left, right, .. } => vec![Node::Expr(*left), Node::Expr(*right)],
        Expr::Unary { expr, .. } => vec![Node::Expr(*expr)],
        Expr::Call { func, args, .. } => {
            let mut out = vec![Node::Expr(*func)];
            out.extend(args.iter().map(Node::Arg));
            out
        }
        Expr::Array { items, .. } => items.iter().map(Node::ArrayItem).collect(),
        Expr::ArrayDimFetch { array, dim, .. } => {
            let mut out = vec![Node::Expr(*array)];
            if let Some(d) = dim {
                out.push(Node::Expr(*d));
            }
            out
        }
        Expr::PropertyFetch { target, property, .. }
        | Expr::NullsafePropertyFetch { target, property, .. } => {
            vec![Node::Expr(*target), Node::Expr(*property)]
        }
        Expr::MethodCall { target, method, args, .. }
        | Expr::NullsafeMethodCall { target, method, args, .. } => {
            let mut out = vec![Node::Expr(*target), Node::Expr(*method)];
            out.extend(args.iter().map(Node::Arg));
            out
        }
        Expr::StaticCall { class, method, args, .. } => {
            let mut out = vec![Node::Expr(*class), Node::Expr(*method)];
            out.extend(args.iter().map(Node::Arg));
            out
        }
        Expr::ClassConstFetch { class, constant, .. } => {
            vec![Node::Expr(*class), Node::Expr(*constant)]
        }
        Expr::New { class, args, .. } => {
            let mut out = vec![Node::Expr(*class)];
            out.extend(args.iter().map(Node::Arg));
            out
        }
        Expr::IndirectVariable { name, .. } => vec![Node::Expr(*name)],
        Expr::Include { expr, .. } => vec![Node::Expr(*expr)],
        Expr::PostInc { var, .. } | Expr::PostDec { var, .. } => vec![Node::Expr(*var)],
        Expr::Ternary {
            condition,
            if_true,
            if_false,
            ..
        } => {
            let mut out = vec![Node::Expr(*condition)];
            if let Some(t) = if_true {
                out.push(Node::Expr(*t));
            }
            out.push(Node::Expr(*if_false));
            out
        }
        Expr::Match { condition, arms, .. } => {
            let mut out = vec![Node::Expr(*condition)];
            out.extend(arms.iter().map(Node::MatchArm));
            out
        }
        Expr::AnonymousClass {
            attributes,
            args,
            extends,
            implements,
            members,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(args.iter().map(Node::Arg));
            if let Some(e) = extends {
                out.push(Node::Name(e));
            }
            out.extend(implements.iter().map(Node::Name));
            out.extend(members.iter().map(Node::ClassMember));
            out
        }
        Expr::Print { expr, .. } => vec![Node::Expr(*expr)],
        Expr::Yield { key, value, .. } => {
            let mut out = Vec::new();
            if let Some(k) = key {
                out.push(Node::Expr(*k));
            }
            if let Some(v) = value {
                out.push(Node::Expr(*v));
            }
            out
        }
        Expr::Cast { expr, .. } => vec![Node::Expr(*expr)],
        Expr::Empty { expr, .. } | Expr::Eval { expr, .. } | Expr::Clone { expr, .. } => {
            vec![Node::Expr(*expr)]
        }
        Expr::Isset { vars, .. } => vars.iter().copied().map(Node::Expr).collect(),
        Expr::Exit { expr, .. } => expr.iter().copied().map(Node::Expr).collect(),
        Expr::Closure {
            attributes,
            params,
            uses,
            return_type,
            body,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(params.iter().map(Node::Param));
            out.extend(uses.iter().map(Node::ClosureUse));
            if let Some(rt) = return_type {
                out.push(Node::Type(*rt));
            }
            out.extend(body.iter().copied().map(Node::Stmt));
            out
        }
        Expr::ArrowFunction {
            attributes,
            params,
            return_type,
            expr,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(params.iter().map(Node::Param));
            if let Some(rt) = return_type {
                out.push(Node::Type(*rt));
            }
            out.push(Node::Expr(*expr));
            out
        }
        Expr::Variable { .. }
        | Expr::Integer { .. }
        | Expr::Float { .. }
        | Expr::Boolean { .. }
        | Expr::Null { .. }
        | Expr::String { .. }
        | Expr::TemplateString { .. }
        | Expr::ShellExec { .. }
        | Expr::MagicConst { .. }
        | Expr::VariadicPlaceholder { .. }
        | Expr::Error { .. } => Vec::new(),
    }
}

fn class_member_children<'ast>(m: &'ast ClassMember<'ast>) -> Vec<Node<'ast>> {
    match m {
        ClassMember::Property {
            attributes,
            ty,
            entries,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            if let Some(t) = ty {
                out.push(Node::Type(*t));
            }
            out.extend(entries.iter().map(Node::PropertyEntry));
            out
        }
        ClassMember::Method {
            attributes,
            params,
            return_type,
            body,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(params.iter().map(Node::Param));
            if let Some(rt) = return_type {
                out.push(Node::Type(*rt));
            }
            out.extend(body.iter().copied().map(Node::Stmt));
            out
        }
        ClassMember::Const {
            attributes,
            ty,
            consts,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            if let Some(t) = ty {
                out.push(Node::Type(*t));
            }
            out.extend(consts.iter().map(Node::ClassConst));
            out
        }
        ClassMember::TraitUse {
            attributes,
            traits,
            adaptations,
            ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(traits.iter().map(Node::Name));
            out.extend(adaptations.iter().map(Node::TraitAdaptation));
            out
        }
        ClassMember::Case {
            attributes, value, ..
        } => {
            let mut out: Vec<Node<'ast>> =
                attributes.iter().map(Node::AttributeGroup).collect();
            out.extend(value.iter().copied().map(Node::Expr));
            out
        }
    }
}

/// Per-step control signal. `Value(T)` short-circuits the walk and is
/// returned as the overall result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Skip,
    Stop,
}

/// Transient walk context. `parents` is rebuilt on the call stack and is
/// never written back into the AST.
pub struct Context<'a, 'ast> {
    pub parents: &'a [Node<'ast>],
    pub depth: usize,
}

fn walk_inner<'ast>(
    node: Node<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut impl FnMut(Node<'ast>, &Context<'_, 'ast>) -> Signal,
) -> Signal {
    let signal = f(
        node,
        &Context {
            parents,
            depth,
        },
    );
    match signal {
        Signal::Stop => return Signal::Stop,
        Signal::Skip => return Signal::Continue,
        Signal::Continue => {}
    }

    parents.push(node);
    for child in node.children() {
        if walk_inner(child, parents, depth + 1, f) == Signal::Stop {
            parents.pop();
            return Signal::Stop;
        }
    }
    parents.pop();
    Signal::Continue
}

/// Pre-order walk. Returns `Signal::Stop` if `f` ever requested an abort.
pub fn walk<'ast>(
    root: Node<'ast>,
    mut f: impl FnMut(Node<'ast>, &Context<'_, 'ast>) -> Signal,
) -> Signal {
    let mut parents = Vec::new();
    walk_inner(root, &mut parents, 0, &mut f)
}

pub fn find_first<'ast>(
    root: Node<'ast>,
    mut pred: impl FnMut(Node<'ast>) -> bool,
) -> Option<Node<'ast>> {
    let mut found = None;
    walk(root, |node, _ctx| {
        if pred(node) {
            found = Some(node);
            Signal::Stop
        } else {
            Signal::Continue
        }
    });
    found
}

pub fn find_nodes<'ast>(
    root: Node<'ast>,
    mut pred: impl FnMut(Node<'ast>) -> bool,
) -> Vec<Node<'ast>> {
    let mut out = Vec::new();
    walk(root, |node, _ctx| {
        if pred(node) {
            out.push(node);
        }
        Signal::Continue
    });
    out
}

/// Depth-first walk whose visitor callback returns a future, for callers
/// that need to `.await` I/O per node. Traversal remains single-threaded
/// and strictly ordered: the next node is not visited until the current
/// one's future resolves.
pub async fn walk_async<'ast, Fut>(
    root: Node<'ast>,
    f: &mut impl FnMut(Node<'ast>, &Context<'_, 'ast>) -> Fut,
) -> Signal
where
    Fut: Future<Output = Signal>,
{
    async fn go<'ast, Fut>(
        node: Node<'ast>,
        parents: &mut Vec<Node<'ast>>,
        depth: usize,
        f: &mut impl FnMut(Node<'ast>, &Context<'_, 'ast>) -> Fut,
    ) -> Signal
    where
        Fut: Future<Output = Signal>,
    {
        let signal = f(node, &Context { parents, depth }).await;
        match signal {
            Signal::Stop => return Signal::Stop,
            Signal::Skip => return Signal::Continue,
            Signal::Continue => {}
        }

        parents.push(node);
        for child in node.children() {
            if Box::pin(go(child, parents, depth + 1, f)).await == Signal::Stop {
                parents.pop();
                return Signal::Stop;
            }
        }
        parents.pop();
        Signal::Continue
    }

    let mut parents = Vec::new();
    go(root, &mut parents, 0, f).await
}

/// Rebuild `root` through `f`, allocating the new tree into `arena`.
/// Returning `None` from `f` deletes that node: it drops out of any list
/// it sat in, or the whole result is `None` if it was the root. Spans are
/// always carried over from the source node.
pub fn transform<'ast>(
    root: Node<'ast>,
    f: &mut impl FnMut(Node<'ast>, &Context<'_, 'ast>) -> Option<Node<'ast>>,
    arena: &'ast bumpalo::Bump,
) -> Option<Node<'ast>> {
    let mut parents = Vec::new();
    transform_inner(root, &mut parents, 0, f, arena)
}

fn transform_inner<'ast>(
    node: Node<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut impl FnMut(Node<'ast>, &Context<'_, 'ast>) -> Option<Node<'ast>>,
    arena: &'ast bumpalo::Bump,
) -> Option<Node<'ast>> {
    let replaced = f(node, &Context { parents, depth })?;
    parents.push(replaced);
    let rebuilt = rebuild(replaced, parents, depth + 1, f, arena);
    parents.pop();
    rebuilt
}

type TransformFn<'x, 'ast> = dyn FnMut(Node<'ast>, &Context<'_, 'ast>) -> Option<Node<'ast>> + 'x;

fn transform_expr<'ast>(
    e: ExprId<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> Option<ExprId<'ast>> {
    as_expr(transform_inner(Node::Expr(e), parents, depth, f, arena))
}

fn transform_stmt<'ast>(
    s: StmtId<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> Option<StmtId<'ast>> {
    as_stmt(transform_inner(Node::Stmt(s), parents, depth, f, arena))
}

fn transform_type<'ast>(
    t: &'ast Type<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> Option<&'ast Type<'ast>> {
    as_type(transform_inner(Node::Type(t), parents, depth, f, arena))
}

fn transform_name_value<'ast>(
    n: Name<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> Option<Name<'ast>> {
    let allocated = arena.alloc(n);
    as_name(transform_inner(Node::Name(allocated), parents, depth, f, arena))
}

fn transform_expr_list<'ast>(
    items: &'ast [ExprId<'ast>],
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> &'ast [ExprId<'ast>] {
    let new: Vec<ExprId<'ast>> = items
        .iter()
        .filter_map(|e| transform_expr(*e, parents, depth, f, arena))
        .collect();
    arena.alloc_slice_copy(&new)
}

fn transform_stmt_list<'ast>(
    items: &'ast [StmtId<'ast>],
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> &'ast [StmtId<'ast>] {
    let new: Vec<StmtId<'ast>> = items
        .iter()
        .filter_map(|s| transform_stmt(*s, parents, depth, f, arena))
        .collect();
    arena.alloc_slice_copy(&new)
}

fn transform_struct_list<'ast, T: Copy>(
    items: &'ast [T],
    wrap: impl Fn(&'ast T) -> Node<'ast>,
    unwrap: impl Fn(Option<Node<'ast>>) -> Option<T>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> &'ast [T] {
    let new: Vec<T> = items
        .iter()
        .filter_map(|item| unwrap(transform_inner(wrap(item), parents, depth, f, arena)))
        .collect();
    arena.alloc_slice_copy(&new)
}

fn as_expr<'ast>(n: Option<Node<'ast>>) -> Option<ExprId<'ast>> {
    match n {
        Some(Node::Expr(e)) => Some(e),
        _ => None,
    }
}

fn as_stmt<'ast>(n: Option<Node<'ast>>) -> Option<StmtId<'ast>> {
    match n {
        Some(Node::Stmt(s)) => Some(s),
        _ => None,
    }
}

fn as_type<'ast>(n: Option<Node<'ast>>) -> Option<&'ast Type<'ast>> {
    match n {
        Some(Node::Type(t)) => Some(t),
        _ => None,
    }
}

fn as_type_owned<'ast>(n: Option<Node<'ast>>) -> Option<Type<'ast>> {
    match n {
        Some(Node::Type(t)) => Some(*t),
        _ => None,
    }
}

fn as_name<'ast>(n: Option<Node<'ast>>) -> Option<Name<'ast>> {
    match n {
        Some(Node::Name(nm)) => Some(*nm),
        _ => None,
    }
}

fn as_attribute_group<'ast>(n: Option<Node<'ast>>) -> Option<AttributeGroup<'ast>> {
    match n {
        Some(Node::AttributeGroup(g)) => Some(*g),
        _ => None,
    }
}

fn as_attribute<'ast>(n: Option<Node<'ast>>) -> Option<Attribute<'ast>> {
    match n {
        Some(Node::Attribute(a)) => Some(*a),
        _ => None,
    }
}

fn as_param<'ast>(n: Option<Node<'ast>>) -> Option<Param<'ast>> {
    match n {
        Some(Node::Param(p)) => Some(*p),
        _ => None,
    }
}

fn as_arg<'ast>(n: Option<Node<'ast>>) -> Option<Arg<'ast>> {
    match n {
        Some(Node::Arg(a)) => Some(*a),
        _ => None,
    }
}

fn as_array_item<'ast>(n: Option<Node<'ast>>) -> Option<ArrayItem<'ast>> {
    match n {
        Some(Node::ArrayItem(a)) => Some(*a),
        _ => None,
    }
}

fn as_case<'ast>(n: Option<Node<'ast>>) -> Option<Case<'ast>> {
    match n {
        Some(Node::Case(c)) => Some(*c),
        _ => None,
    }
}

fn as_catch<'ast>(n: Option<Node<'ast>>) -> Option<Catch<'ast>> {
    match n {
        Some(Node::Catch(c)) => Some(*c),
        _ => None,
    }
}

fn as_match_arm<'ast>(n: Option<Node<'ast>>) -> Option<MatchArm<'ast>> {
    match n {
        Some(Node::MatchArm(a)) => Some(*a),
        _ => None,
    }
}

fn as_use_item<'ast>(n: Option<Node<'ast>>) -> Option<UseItem<'ast>> {
    match n {
        Some(Node::UseItem(u)) => Some(*u),
        _ => None,
    }
}

fn as_trait_adaptation<'ast>(n: Option<Node<'ast>>) -> Option<TraitAdaptation<'ast>> {
    match n {
        Some(Node::TraitAdaptation(t)) => Some(*t),
        _ => None,
    }
}

fn as_declare_item<'ast>(n: Option<Node<'ast>>) -> Option<DeclareItem<'ast>> {
    match n {
        Some(Node::DeclareItem(d)) => Some(*d),
        _ => None,
    }
}

fn as_static_var<'ast>(n: Option<Node<'ast>>) -> Option<StaticVar<'ast>> {
    match n {
        Some(Node::StaticVar(s)) => Some(*s),
        _ => None,
    }
}

fn as_closure_use<'ast>(n: Option<Node<'ast>>) -> Option<ClosureUse<'ast>> {
    match n {
        Some(Node::ClosureUse(c)) => Some(*c),
        _ => None,
    }
}

fn as_property_entry<'ast>(n: Option<Node<'ast>>) -> Option<PropertyEntry<'ast>> {
    match n {
        Some(Node::PropertyEntry(p)) => Some(*p),
        _ => None,
    }
}

fn as_class_const<'ast>(n: Option<Node<'ast>>) -> Option<ClassConst<'ast>> {
    match n {
        Some(Node::ClassConst(c)) => Some(*c),
        _ => None,
    }
}

fn as_class_member<'ast>(n: Option<Node<'ast>>) -> Option<ClassMember<'ast>> {
    match n {
        Some(Node::ClassMember(m)) => Some(*m),
        _ => None,
    }
}

/// Recurse into `node`'s own structural children and allocate a rebuilt
/// copy into `arena`. `node` has already passed through `f` once (by the
/// caller, `transform_inner`); this only handles the recursive half.
fn rebuild<'ast>(
    node: Node<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> Option<Node<'ast>> {
    match node {
        Node::Program(p) => {
            let statements = transform_stmt_list(p.statements, parents, depth, f, arena);
            Some(Node::Program(arena.alloc(Program {
                statements,
                errors: p.errors,
                span: p.span,
            })))
        }
        Node::Stmt(s) => rebuild_stmt(s, parents, depth, f, arena).map(Node::Stmt),
        Node::Expr(e) => rebuild_expr(e, parents, depth, f, arena).map(Node::Expr),
        Node::ClassMember(m) => {
            rebuild_class_member(m, parents, depth, f, arena).map(Node::ClassMember)
        }
        Node::Type(t) => rebuild_type(t, parents, depth, f, arena).map(Node::Type),
        Node::Param(p) => {
            let new = Param {
                attributes: transform_struct_list(
                    p.attributes,
                    Node::AttributeGroup,
                    as_attribute_group,
                    parents,
                    depth,
                    f,
                    arena,
                ),
                modifiers: p.modifiers,
                name: p.name,
                ty: p.ty.and_then(|t| transform_type(t, parents, depth, f, arena)),
                default: p
                    .default
                    .and_then(|d| transform_expr(d, parents, depth, f, arena)),
                by_ref: p.by_ref,
                variadic: p.variadic,
                span: p.span,
            };
            Some(Node::Param(arena.alloc(new)))
        }
        Node::Arg(a) => {
            let new = Arg {
                name: a.name,
                value: transform_expr(a.value, parents, depth, f, arena)?,
                unpack: a.unpack,
                span: a.span,
            };
            Some(Node::Arg(arena.alloc(new)))
        }
        Node::ArrayItem(a) => {
            let new = ArrayItem {
                key: a.key.and_then(|k| transform_expr(k, parents, depth, f, arena)),
                value: transform_expr(a.value, parents, depth, f, arena)?,
                by_ref: a.by_ref,
                unpack: a.unpack,
                span: a.span,
            };
            Some(Node::ArrayItem(arena.alloc(new)))
        }
        Node::Case(c) => {
            let new = Case {
                condition: c
                    .condition
                    .and_then(|e| transform_expr(e, parents, depth, f, arena)),
                body: transform_stmt_list(c.body, parents, depth, f, arena),
                span: c.span,
            };
            Some(Node::Case(arena.alloc(new)))
        }
        Node::Catch(c) => {
            let new = Catch {
                types: transform_struct_list(
                    c.types, Node::Name, as_name, parents, depth, f, arena,
                ),
                var: c.var,
                body: transform_stmt_list(c.body, parents, depth, f, arena),
                span: c.span,
            };
            Some(Node::Catch(arena.alloc(new)))
        }
        Node::MatchArm(a) => {
            let new = MatchArm {
                conditions: a
                    .conditions
                    .map(|cs| transform_expr_list(cs, parents, depth, f, arena)),
                body: transform_expr(a.body, parents, depth, f, arena)?,
                span: a.span,
            };
            Some(Node::MatchArm(arena.alloc(new)))
        }
        Node::Name(n) => Some(Node::Name(n)),
        Node::UseItem(u) => {
            let new = UseItem {
                name: transform_name_value(u.name, parents, depth, f, arena)?,
                alias: u.alias,
                kind: u.kind,
                span: u.span,
            };
            Some(Node::UseItem(arena.alloc(new)))
        }
        Node::TraitAdaptation(t) => {
            let new = match *t {
                TraitAdaptation::Precedence {
                    method,
                    insteadof,
                    span,
                } => TraitAdaptation::Precedence {
                    method,
                    insteadof: transform_struct_list(
                        insteadof, Node::Name, as_name, parents, depth, f, arena,
                    ),
                    span,
                },
                TraitAdaptation::Alias {
                    method,
                    alias,
                    visibility,
                    span,
                } => TraitAdaptation::Alias {
                    method,
                    alias,
                    visibility,
                    span,
                },
            };
            Some(Node::TraitAdaptation(arena.alloc(new)))
        }
        Node::AttributeGroup(g) => {
            let new = AttributeGroup {
                attributes: transform_struct_list(
                    g.attributes,
                    Node::Attribute,
                    as_attribute,
                    parents,
                    depth,
                    f,
                    arena,
                ),
                span: g.span,
            };
            Some(Node::AttributeGroup(arena.alloc(new)))
        }
        Node::Attribute(a) => {
            let new = Attribute {
                name: transform_name_value(a.name, parents, depth, f, arena)?,
                args: transform_struct_list(a.args, Node::Arg, as_arg, parents, depth, f, arena),
                span: a.span,
            };
            Some(Node::Attribute(arena.alloc(new)))
        }
        Node::DeclareItem(d) => {
            let new = DeclareItem {
                key: d.key,
                value: transform_expr(d.value, parents, depth, f, arena)?,
                span: d.span,
            };
            Some(Node::DeclareItem(arena.alloc(new)))
        }
        Node::StaticVar(s) => {
            let new = StaticVar {
                var: transform_expr(s.var, parents, depth, f, arena)?,
                default: s
                    .default
                    .and_then(|d| transform_expr(d, parents, depth, f, arena)),
                span: s.span,
            };
            Some(Node::StaticVar(arena.alloc(new)))
        }
        Node::ClosureUse(c) => Some(Node::ClosureUse(c)),
        Node::PropertyEntry(p) => {
            let new = PropertyEntry {
                name: p.name,
                default: p
                    .default
                    .and_then(|d| transform_expr(d, parents, depth, f, arena)),
                span: p.span,
            };
            Some(Node::PropertyEntry(arena.alloc(new)))
        }
        Node::ClassConst(c) => {
            let new = ClassConst {
                name: c.name,
                value: transform_expr(c.value, parents, depth, f, arena)?,
                span: c.span,
            };
            Some(Node::ClassConst(arena.alloc(new)))
        }
    }
}

fn rebuild_stmt<'ast>(
    s: StmtId<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> Option<StmtId<'ast>> {
    let new_stmt = match *s {
        Stmt::Echo { exprs, span } => Stmt::Echo {
            exprs: transform_expr_list(exprs, parents, depth, f, arena),
            span,
        },
        Stmt::Return { expr, span } => Stmt::Return {
            expr: expr.and_then(|e| transform_expr(e, parents, depth, f, arena)),
            span,
        },
        Stmt::If {
            condition,
            then_block,
            else_block,
            span,
        } => Stmt::If {
            condition: transform_expr(condition, parents, depth, f, arena)?,
            then_block: transform_stmt_list(then_block, parents, depth, f, arena),
            else_block: else_block.map(|eb| transform_stmt_list(eb, parents, depth, f, arena)),
            span,
        },
        Stmt::While { condition, body, span } => Stmt::While {
            condition: transform_expr(condition, parents, depth, f, arena)?,
            body: transform_stmt_list(body, parents, depth, f, arena),
            span,
        },
        Stmt::DoWhile { body, condition, span } => Stmt::DoWhile {
            body: transform_stmt_list(body, parents, depth, f, arena),
            condition: transform_expr(condition, parents, depth, f, arena)?,
            span,
        },
        Stmt::For {
            init,
            condition,
            loop_expr,
            body,
            span,
        } => Stmt::For {
            init: transform_expr_list(init, parents, depth, f, arena),
            condition: transform_expr_list(condition, parents, depth, f, arena),
            loop_expr: transform_expr_list(loop_expr, parents, depth, f, arena),
            body: transform_stmt_list(body, parents, depth, f, arena),
            span,
        },
        Stmt::Foreach {
            expr,
            key_var,
            value_var,
            by_ref,
            body,
            span,
        } => Stmt::Foreach {
            expr: transform_expr(expr, parents, depth, f, arena)?,
            key_var: key_var.and_then(|k| transform_expr(k, parents, depth, f, arena)),
            value_var: transform_expr(value_var, parents, depth, f, arena)?,
            by_ref,
            body: transform_stmt_list(body, parents, depth, f, arena),
            span,
        },
        Stmt::Block { statements, span } => Stmt::Block {
            statements: transform_stmt_list(statements, parents, depth, f, arena),
            span,
        },
        Stmt::Function {
            attributes,
            name,
            by_ref,
            params,
            return_type,
            body,
            doc_comment,
            span,
        } => Stmt::Function {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            name,
            by_ref,
            params: transform_struct_list(params, Node::Param, as_param, parents, depth, f, arena),
            return_type: return_type.and_then(|t| transform_type(t, parents, depth, f, arena)),
            body: transform_stmt_list(body, parents, depth, f, arena),
            doc_comment,
            span,
        },
        Stmt::Class {
            attributes,
            modifiers,
            name,
            extends,
            implements,
            members,
            doc_comment,
            span,
        } => Stmt::Class {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            modifiers,
            name,
            extends: extends.and_then(|e| transform_name_value(e, parents, depth, f, arena)),
            implements: transform_struct_list(
                implements, Node::Name, as_name, parents, depth, f, arena,
            ),
            members: transform_struct_list(
                members,
                Node::ClassMember,
                as_class_member,
                parents,
                depth,
                f,
                arena,
            ),
            doc_comment,
            span,
        },
        Stmt::Interface {
            attributes,
            name,
            extends,
            members,
            doc_comment,
            span,
        } => Stmt::Interface {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            name,
            extends: transform_struct_list(
                extends, Node::Name, as_name, parents, depth, f, arena,
            ),
            members: transform_struct_list(
                members,
                Node::ClassMember,
                as_class_member,
                parents,
                depth,
                f,
                arena,
            ),
            doc_comment,
            span,
        },
        Stmt::Trait {
            attributes,
            name,
            members,
            doc_comment,
            span,
        } => Stmt::Trait {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            name,
            members: transform_struct_list(
                members,
                Node::ClassMember,
                as_class_member,
                parents,
                depth,
                f,
                arena,
            ),
            doc_comment,
            span,
        },
        Stmt::Enum {
            attributes,
            name,
            backed_type,
            implements,
            members,
            doc_comment,
            span,
        } => Stmt::Enum {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            name,
            backed_type: backed_type.and_then(|t| transform_type(t, parents, depth, f, arena)),
            implements: transform_struct_list(
                implements, Node::Name, as_name, parents, depth, f, arena,
            ),
            members: transform_struct_list(
                members,
                Node::ClassMember,
                as_class_member,
                parents,
                depth,
                f,
                arena,
            ),
            doc_comment,
            span,
        },
        Stmt::Namespace { name, body, span } => Stmt::Namespace {
            name: name.and_then(|n| transform_name_value(n, parents, depth, f, arena)),
            body: body.map(|b| transform_stmt_list(b, parents, depth, f, arena)),
            span,
        },
        Stmt::Use { uses, kind, span } => Stmt::Use {
            uses: transform_struct_list(
                uses, Node::UseItem, as_use_item, parents, depth, f, arena,
            ),
            kind,
            span,
        },
        Stmt::Switch { condition, cases, span } => Stmt::Switch {
            condition: transform_expr(condition, parents, depth, f, arena)?,
            cases: transform_struct_list(cases, Node::Case, as_case, parents, depth, f, arena),
            span,
        },
        Stmt::Try {
            body,
            catches,
            finally,
            span,
        } => Stmt::Try {
            body: transform_stmt_list(body, parents, depth, f, arena),
            catches: transform_struct_list(
                catches, Node::Catch, as_catch, parents, depth, f, arena,
            ),
            finally: finally.map(|fin| transform_stmt_list(fin, parents, depth, f, arena)),
            span,
        },
        Stmt::Throw { expr, span } => Stmt::Throw {
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Stmt::Const {
            attributes,
            consts,
            doc_comment,
            span,
        } => Stmt::Const {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            consts: transform_struct_list(
                consts,
                Node::ClassConst,
                as_class_const,
                parents,
                depth,
                f,
                arena,
            ),
            doc_comment,
            span,
        },
        Stmt::Break { level, span } => Stmt::Break {
            level: level.and_then(|e| transform_expr(e, parents, depth, f, arena)),
            span,
        },
        Stmt::Continue { level, span } => Stmt::Continue {
            level: level.and_then(|e| transform_expr(e, parents, depth, f, arena)),
            span,
        },
        Stmt::Global { vars, span } => Stmt::Global {
            vars: transform_expr_list(vars, parents, depth, f, arena),
            span,
        },
        Stmt::Static { vars, span } => Stmt::Static {
            vars: transform_struct_list(
                vars,
                Node::StaticVar,
                as_static_var,
                parents,
                depth,
                f,
                arena,
            ),
            span,
        },
        Stmt::Unset { vars, span } => Stmt::Unset {
            vars: transform_expr_list(vars, parents, depth, f, arena),
            span,
        },
        Stmt::Expression { expr, span } => Stmt::Expression {
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Stmt::InlineHtml { value, span } => Stmt::InlineHtml { value, span },
        Stmt::Nop { span } => Stmt::Nop { span },
        Stmt::Label { name, span } => Stmt::Label { name, span },
        Stmt::Goto { label, span } => Stmt::Goto { label, span },
        Stmt::Error { span } => Stmt::Error { span },
        Stmt::Declare {
            declares,
            body,
            span,
        } => Stmt::Declare {
            declares: transform_struct_list(
                declares,
                Node::DeclareItem,
                as_declare_item,
                parents,
                depth,
                f,
                arena,
            ),
            body: transform_stmt_list(body, parents, depth, f, arena),
            span,
        },
    };
    Some(arena.alloc(new_stmt))
}

fn rebuild_expr<'ast>(
    e: ExprId<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> Option<ExprId<'ast>> {
    let new_expr = match *e {
        Expr::Assign { var, expr, span } => Expr::Assign {
            var: transform_expr(var, parents, depth, f, arena)?,
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::AssignRef { var, expr, span } => Expr::AssignRef {
            var: transform_expr(var, parents, depth, f, arena)?,
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::AssignOp { var, op, expr, span } => Expr::AssignOp {
            var: transform_expr(var, parents, depth, f, arena)?,
            op,
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::Binary { left, op, right, span } => Expr::Binary {
            left: transform_expr(left, parents, depth, f, arena)?,
            op,
            right: transform_expr(right, parents, depth, f, arena)?,
            span,
        },
        Expr::Unary { op, expr, span } => Expr::Unary {
            op,
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::Call { func, args, span } => Expr::Call {
            func: transform_expr(func, parents, depth, f, arena)?,
            args: transform_struct_list(args, Node::Arg, as_arg, parents, depth, f, arena),
            span,
        },
        Expr::Array { items, span } => Expr::Array {
            items: transform_struct_list(
                items,
                Node::ArrayItem,
                as_array_item,
                parents,
                depth,
                f,
                arena,
            ),
            span,
        },
        Expr::ArrayDimFetch { array, dim, span } => Expr::ArrayDimFetch {
            array: transform_expr(array, parents, depth, f, arena)?,
            dim: dim.and_then(|d| transform_expr(d, parents, depth, f, arena)),
            span,
        },
        Expr::PropertyFetch {
            target,
            property,
            span,
        } => Expr::PropertyFetch {
            target: transform_expr(target, parents, depth, f, arena)?,
            property: transform_expr(property, parents, depth, f, arena)?,
            span,
        },
        Expr::MethodCall {
            target,
            method,
            args,
            span,
        } => Expr::MethodCall {
            target: transform_expr(target, parents, depth, f, arena)?,
            method: transform_expr(method, parents, depth, f, arena)?,
            args: transform_struct_list(args, Node::Arg, as_arg, parents, depth, f, arena),
            span,
        },
        Expr::StaticCall {
            class,
            method,
            args,
            span,
        } => Expr::StaticCall {
            class: transform_expr(class, parents, depth, f, arena)?,
            method: transform_expr(method, parents, depth, f, arena)?,
            args: transform_struct_list(args, Node::Arg, as_arg, parents, depth, f, arena),
            span,
        },
        Expr::ClassConstFetch { class, constant, span } => Expr::ClassConstFetch {
            class: transform_expr(class, parents, depth, f, arena)?,
            constant: transform_expr(constant, parents, depth, f, arena)?,
            span,
        },
        Expr::New { class, args, span } => Expr::New {
            class: transform_expr(class, parents, depth, f, arena)?,
            args: transform_struct_list(args, Node::Arg, as_arg, parents, depth, f, arena),
            span,
        },
        Expr::Variable { name, span } => Expr::Variable { name, span },
        Expr::IndirectVariable { name, span } => Expr::IndirectVariable {
            name: transform_expr(name, parents, depth, f, arena)?,
            span,
        },
        Expr::Integer { value, span } => Expr::Integer { value, span },
        Expr::Float { value, span } => Expr::Float { value, span },
        Expr::Boolean { value, span } => Expr::Boolean { value, span },
        Expr::Null { span } => Expr::Null { span },
        Expr::String { value, span } => Expr::String { value, span },
        Expr::TemplateString {
            raw,
            is_nowdoc,
            span,
        } => Expr::TemplateString {
            raw,
            is_nowdoc,
            span,
        },
        Expr::ShellExec { raw, span } => Expr::ShellExec { raw, span },
        Expr::Include { kind, expr, span } => Expr::Include {
            kind,
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::MagicConst { kind, span } => Expr::MagicConst { kind, span },
        Expr::PostInc { var, span } => Expr::PostInc {
            var: transform_expr(var, parents, depth, f, arena)?,
            span,
        },
        Expr::PostDec { var, span } => Expr::PostDec {
            var: transform_expr(var, parents, depth, f, arena)?,
            span,
        },
        Expr::Ternary {
            condition,
            if_true,
            if_false,
            span,
        } => Expr::Ternary {
            condition: transform_expr(condition, parents, depth, f, arena)?,
            if_true: if_true.and_then(|t| transform_expr(t, parents, depth, f, arena)),
            if_false: transform_expr(if_false, parents, depth, f, arena)?,
            span,
        },
        Expr::Match { condition, arms, span } => Expr::Match {
            condition: transform_expr(condition, parents, depth, f, arena)?,
            arms: transform_struct_list(
                arms,
                Node::MatchArm,
                as_match_arm,
                parents,
                depth,
                f,
                arena,
            ),
            span,
        },
        Expr::AnonymousClass {
            attributes,
            modifiers,
            args,
            extends,
            implements,
            members,
            span,
        } => Expr::AnonymousClass {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            modifiers,
            args: transform_struct_list(args, Node::Arg, as_arg, parents, depth, f, arena),
            extends: extends.and_then(|e| transform_name_value(e, parents, depth, f, arena)),
            implements: transform_struct_list(
                implements, Node::Name, as_name, parents, depth, f, arena,
            ),
            members: transform_struct_list(
                members,
                Node::ClassMember,
                as_class_member,
                parents,
                depth,
                f,
                arena,
            ),
            span,
        },
        Expr::Print { expr, span } => Expr::Print {
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::Yield {
            key,
            value,
            from,
            span,
        } => Expr::Yield {
            key: key.and_then(|k| transform_expr(k, parents, depth, f, arena)),
            value: value.and_then(|v| transform_expr(v, parents, depth, f, arena)),
            from,
            span,
        },
        Expr::Cast { kind, expr, span } => Expr::Cast {
            kind,
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::Empty { expr, span } => Expr::Empty {
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::Isset { vars, span } => Expr::Isset {
            vars: transform_expr_list(vars, parents, depth, f, arena),
            span,
        },
        Expr::Eval { expr, span } => Expr::Eval {
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::Exit { expr, span } => Expr::Exit {
            expr: expr.and_then(|e| transform_expr(e, parents, depth, f, arena)),
            span,
        },
        Expr::Closure {
            attributes,
            is_static,
            by_ref,
            params,
            uses,
            return_type,
            body,
            span,
        } => Expr::Closure {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            is_static,
            by_ref,
            params: transform_struct_list(params, Node::Param, as_param, parents, depth, f, arena),
            uses: transform_struct_list(
                uses,
                Node::ClosureUse,
                as_closure_use,
                parents,
                depth,
                f,
                arena,
            ),
            return_type: return_type.and_then(|t| transform_type(t, parents, depth, f, arena)),
            body: transform_stmt_list(body, parents, depth, f, arena),
            span,
        },
        Expr::ArrowFunction {
            attributes,
            is_static,
            by_ref,
            params,
            return_type,
            expr,
            span,
        } => Expr::ArrowFunction {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            is_static,
            by_ref,
            params: transform_struct_list(params, Node::Param, as_param, parents, depth, f, arena),
            return_type: return_type.and_then(|t| transform_type(t, parents, depth, f, arena)),
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::Clone { expr, span } => Expr::Clone {
            expr: transform_expr(expr, parents, depth, f, arena)?,
            span,
        },
        Expr::NullsafePropertyFetch {
            target,
            property,
            span,
        } => Expr::NullsafePropertyFetch {
            target: transform_expr(target, parents, depth, f, arena)?,
            property: transform_expr(property, parents, depth, f, arena)?,
            span,
        },
        Expr::NullsafeMethodCall {
            target,
            method,
            args,
            span,
        } => Expr::NullsafeMethodCall {
            target: transform_expr(target, parents, depth, f, arena)?,
            method: transform_expr(method, parents, depth, f, arena)?,
            args: transform_struct_list(args, Node::Arg, as_arg, parents, depth, f, arena),
            span,
        },
        Expr::VariadicPlaceholder { span } => Expr::VariadicPlaceholder { span },
        Expr::Error { span } => Expr::Error { span },
    };
    Some(arena.alloc(new_expr))
}

fn rebuild_class_member<'ast>(
    m: &'ast ClassMember<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> Option<&'ast ClassMember<'ast>> {
    let new_member = match *m {
        ClassMember::Property {
            attributes,
            modifiers,
            ty,
            entries,
            doc_comment,
            span,
        } => ClassMember::Property {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            modifiers,
            ty: ty.and_then(|t| transform_type(t, parents, depth, f, arena)),
            entries: transform_struct_list(
                entries,
                Node::PropertyEntry,
                as_property_entry,
                parents,
                depth,
                f,
                arena,
            ),
            doc_comment,
            span,
        },
        ClassMember::Method {
            attributes,
            modifiers,
            name,
            params,
            return_type,
            body,
            doc_comment,
            span,
        } => ClassMember::Method {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            modifiers,
            name,
            params: transform_struct_list(params, Node::Param, as_param, parents, depth, f, arena),
            return_type: return_type.and_then(|t| transform_type(t, parents, depth, f, arena)),
            body: transform_stmt_list(body, parents, depth, f, arena),
            doc_comment,
            span,
        },
        ClassMember::Const {
            attributes,
            modifiers,
            ty,
            consts,
            doc_comment,
            span,
        } => ClassMember::Const {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            modifiers,
            ty: ty.and_then(|t| transform_type(t, parents, depth, f, arena)),
            consts: transform_struct_list(
                consts,
                Node::ClassConst,
                as_class_const,
                parents,
                depth,
                f,
                arena,
            ),
            doc_comment,
            span,
        },
        ClassMember::TraitUse {
            attributes,
            traits,
            adaptations,
            doc_comment,
            span,
        } => ClassMember::TraitUse {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            traits: transform_struct_list(
                traits, Node::Name, as_name, parents, depth, f, arena,
            ),
            adaptations: transform_struct_list(
                adaptations,
                Node::TraitAdaptation,
                as_trait_adaptation,
                parents,
                depth,
                f,
                arena,
            ),
            doc_comment,
            span,
        },
        ClassMember::Case {
            attributes,
            name,
            value,
            doc_comment,
            span,
        } => ClassMember::Case {
            attributes: transform_struct_list(
                attributes,
                Node::AttributeGroup,
                as_attribute_group,
                parents,
                depth,
                f,
                arena,
            ),
            name,
            value: value.and_then(|v| transform_expr(v, parents, depth, f, arena)),
            doc_comment,
            span,
        },
    };
    Some(arena.alloc(new_member))
}

fn rebuild_type<'ast>(
    t: &'ast Type<'ast>,
    parents: &mut Vec<Node<'ast>>,
    depth: usize,
    f: &mut TransformFn<'_, 'ast>,
    arena: &'ast bumpalo::Bump,
) -> Option<&'ast Type<'ast>> {
    let new_type = match *t {
        Type::Simple(tok) => Type::Simple(tok),
        Type::Name(n) => Type::Name(transform_name_value(n, parents, depth, f, arena)?),
        Type::Union(parts) => Type::Union(transform_struct_list(
            parts,
            Node::Type,
            as_type_owned,
            parents,
            depth,
            f,
            arena,
        )),
        Type::Intersection(parts) => Type::Intersection(transform_struct_list(
            parts,
            Node::Type,
            as_type_owned,
            parents,
            depth,
            f,
            arena,
        )),
        Type::Nullable(inner) => Type::Nullable(transform_type(inner, parents, depth, f, arena)?),
    };
    Some(arena.alloc(new_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_source, ParseOptions};
    use bumpalo::Bump;

    #[test]
    fn walk_visits_every_variable_in_source_order() {
        let code = b"<?php $a = $b + $c;";
        let arena = Bump::new();
        let program = parse_source(code, &arena, ParseOptions::default());
        assert!(program.errors.is_empty());

        let mut names = Vec::new();
        walk(Node::Program(&program), |node, _ctx| {
            if let Node::Expr(Expr::Variable { name, .. }) = node {
                names.push(name.as_str(code).to_vec());
            }
            Signal::Continue
        });

        assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn find_first_locates_the_outermost_match_on_a_predicate() {
        let code = b"<?php if ($cond) { echo 1; } else { echo 2; }";
        let arena = Bump::new();
        let program = parse_source(code, &arena, ParseOptions::default());
        assert!(program.errors.is_empty());

        let found = find_first(Node::Program(&program), |node| {
            matches!(node, Node::Stmt(Stmt::If { .. }))
        });
        assert!(found.is_some());
    }

    #[test]
    fn find_nodes_collects_every_echo_statement() {
        let code = b"<?php echo 1; echo 2; echo 3;";
        let arena = Bump::new();
        let program = parse_source(code, &arena, ParseOptions::default());
        assert!(program.errors.is_empty());

        let echoes = find_nodes(Node::Program(&program), |node| {
            matches!(node, Node::Stmt(Stmt::Echo { .. }))
        });
        assert_eq!(echoes.len(), 3);
    }

    #[test]
    fn skip_prunes_children_without_stopping_the_whole_walk() {
        let code = b"<?php function f() { echo 1; } echo 2;";
        let arena = Bump::new();
        let program = parse_source(code, &arena, ParseOptions::default());
        assert!(program.errors.is_empty());

        let mut echo_count = 0;
        walk(Node::Program(&program), |node, _ctx| {
            if matches!(node, Node::Stmt(Stmt::Function { .. })) {
                return Signal::Skip;
            }
            if matches!(node, Node::Stmt(Stmt::Echo { .. })) {
                echo_count += 1;
            }
            Signal::Continue
        });

        assert_eq!(echo_count, 1, "the echo inside the skipped function must not be visited");
    }

    #[test]
    fn stop_halts_the_walk_immediately() {
        let code = b"<?php echo 1; echo 2; echo 3;";
        let arena = Bump::new();
        let program = parse_source(code, &arena, ParseOptions::default());
        assert!(program.errors.is_empty());

        let mut visited = 0;
        walk(Node::Program(&program), |node, _ctx| {
            if matches!(node, Node::Stmt(Stmt::Echo { .. })) {
                visited += 1;
                if visited == 1 {
                    return Signal::Stop;
                }
            }
            Signal::Continue
        });

        assert_eq!(visited, 1);
    }

    #[test]
    fn transform_returning_none_deletes_the_root() {
        let code = b"<?php echo 1;";
        let arena = Bump::new();
        let program = parse_source(code, &arena, ParseOptions::default());
        assert!(program.errors.is_empty());

        let result = transform(Node::Program(&program), &mut |_node, _ctx| None, &arena);
        assert!(result.is_none());
    }

    #[test]
    fn transform_can_swap_in_a_freshly_allocated_node() {
        let code = b"<?php $old;";
        let arena = Bump::new();
        let program = parse_source(code, &arena, ParseOptions::default());
        assert!(program.errors.is_empty());

        let original = find_first(Node::Program(&program), |node| {
            matches!(node, Node::Expr(Expr::Variable { .. }))
        })
        .expect("expected a variable expression");

        let renamed_span = Span::new(0, 3);
        let renamed: ExprId = arena.alloc(Expr::Variable {
            name: renamed_span,
            span: renamed_span,
        });

        let result = transform(
            original,
            &mut |node, _ctx| match node {
                Node::Expr(Expr::Variable { .. }) => Some(Node::Expr(renamed)),
                other => Some(other),
            },
            &arena,
        );

        match result {
            Some(Node::Expr(Expr::Variable { name, .. })) => assert_eq!(*name, renamed_span),
            other => panic!("expected a replaced variable node, got {other:?}"),
        }
    }
}
