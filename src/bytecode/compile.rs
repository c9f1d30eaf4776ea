use crate::{
    bytecode::{
        compile_error::{CompileError, CompileResult},
        ir::{CodeStream, Function},
        op::{Bc, FunIdx, MAX_FUN_IDX, MAX_NUM_ARGS, MISSING_ARG_OFFSET, NumArgs},
        optimize::{NoopOptimizer, Optimizer},
        pool::ConstantPool,
        verify::CodeVerifier,
    },
    lang::{
        closure::Formal,
        node::{Arg, Node},
        value::{ArgName, Constant, Symbol, Value},
    },
};

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Most arguments a single call may have.
    pub max_num_args: usize,
    /// Most code objects a compiled function may hold.
    pub max_codes: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            max_num_args: MAX_NUM_ARGS,
            max_codes: MAX_FUN_IDX + 1,
        }
    }
}

/// Default of a compiled formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormalDefault {
    /// No default value.
    Missing,
    /// Promise code computing the default.
    Promise(FunIdx),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFormal {
    pub name: Symbol,
    pub default: FormalDefault,
}

/// Output of [`Compiler::finalize`]: a verified, optimized function and its
/// formal parameters.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub function: Function,
    pub formals: Vec<CompiledFormal>,
}

/// Lowers AST expressions to bytecode.
///
/// Arguments are never evaluated at the call site: each one becomes its own
/// promise code, referenced from the caller by function-table index.
pub struct Compiler<'p> {
    pool: &'p ConstantPool,
    config: CompilerConfig,
    optimizer: Box<dyn Optimizer>,
}

impl<'p> Compiler<'p> {
    pub fn new(pool: &'p ConstantPool) -> Self {
        Self {
            pool,
            config: CompilerConfig::default(),
            optimizer: Box::new(NoopOptimizer),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_optimizer(mut self, optimizer: impl Optimizer + 'static) -> Self {
        self.optimizer = Box::new(optimizer);
        self
    }

    /// Compile `node` into a new code object of `function`, terminated by
    /// `ret`, and return its slot.
    pub fn compile(&self, function: &mut Function, node: &Node) -> CompileResult<FunIdx> {
        let mut cs = CodeStream::new(function, node)?;
        self.compile_expr(function, &mut cs, node)?;
        cs.emit(Bc::Ret);
        let idx = cs.finalize(function)?;
        tracing::trace!(idx, %node, "compiled promise");
        Ok(idx)
    }

    /// Compile every default of `formals`; a parameter without default gets
    /// [`MISSING_ARG_OFFSET`] and no slot.
    pub fn compile_formals(
        &self,
        function: &mut Function,
        formals: &[Formal],
    ) -> CompileResult<Vec<FunIdx>> {
        formals
            .iter()
            .map(|formal| {
                if formal.has_default() {
                    self.compile(function, &formal.default)
                } else {
                    Ok(MISSING_ARG_OFFSET)
                }
            })
            .collect()
    }

    /// Compile a closure: body into slot 0, defaults of `formals` into
    /// their own promise code. The result is verified, optimized and
    /// verified again.
    pub fn finalize(&self, body: &Node, formals: &[Formal]) -> CompileResult<CompiledFunction> {
        tracing::debug!(%body, formals = formals.len(), "compiling closure");

        let mut function = Function::with_limit(self.config.max_codes);

        // Reserve slot 0 before the formals take theirs.
        let mut cs = CodeStream::new(&mut function, body)?;
        let promises = self.compile_formals(&mut function, formals)?;
        self.compile_expr(&mut function, &mut cs, body)?;
        cs.emit(Bc::Ret);
        cs.finalize(&mut function)?;

        let verifier = CodeVerifier::new(self.pool);
        verifier.verify_function_layout(&mut function)?;

        let mut optimized = self.optimizer.optimize(function);
        verifier.verify_function_layout(&mut optimized)?;
        if optimized.body().is_none() {
            return Err(CompileError::MissingBody);
        }

        let formals = reassemble_formals(&optimized, formals, &promises)?;
        tracing::debug!(codes = optimized.len(), "closure compiled");

        Ok(CompiledFunction {
            function: optimized,
            formals,
        })
    }

    fn compile_expr(
        &self,
        function: &mut Function,
        cs: &mut CodeStream,
        node: &Node,
    ) -> CompileResult<()> {
        match node {
            Node::Call { callee, args } => self.compile_call(function, cs, node, callee, args),

            Node::Symbol(sym) => self.compile_getvar(cs, sym),

            // Left behind by complex-assignment rewriting: the promise has
            // been forced and only its value matters.
            Node::Promise { env: Some(_), .. } => Err(CompileError::promise_with_env()),
            Node::Promise { value: None, .. } => Err(CompileError::unevaluated_promise()),
            Node::Promise {
                value: Some(value),
                env: None,
            } => self.compile_const(cs, value),

            Node::Bytecode => Err(CompileError::bytecode_in_source()),

            Node::Literal(constant) => self.compile_const(cs, constant),
        }
    }

    fn compile_call(
        &self,
        function: &mut Function,
        cs: &mut CodeStream,
        node: &Node,
        callee: &Node,
        args: &[Arg],
    ) -> CompileResult<()> {
        let max = self.config.max_num_args.min(MAX_NUM_ARGS);
        if args.len() > max {
            return Err(CompileError::TooManyArguments {
                count: args.len(),
                max,
            });
        }

        match callee {
            Node::Symbol(sym) => {
                cs.emit(Bc::GetFun(self.pool.intern(sym)?));
            }
            other => {
                self.compile_expr(function, cs, other)?;
                cs.emit(Bc::IsFun);
            }
        }

        let mut names = Vec::with_capacity(args.len());
        for arg in args {
            let promise = self.compile(function, &arg.value)?;
            cs.emit(Bc::MakePromise(promise));

            names.push(if arg.is_dots() {
                ArgName::Dots
            } else {
                match &arg.tag {
                    Some(tag) => ArgName::Tag(tag.clone()),
                    None => ArgName::Unnamed,
                }
            });
        }

        if names.iter().all(|n| *n == ArgName::Unnamed) {
            cs.emit(Bc::Call(args.len() as NumArgs));
        } else {
            let names = self.pool.insert(Value::Names(names))?;
            cs.emit(Bc::CallNamed(names));
        }
        cs.add_ast(node);

        Ok(())
    }

    fn compile_getvar(&self, cs: &mut CodeStream, sym: &Symbol) -> CompileResult<()> {
        match sym {
            Symbol::Missing => {
                let idx = self.pool.insert(Value::Symbol(Symbol::Missing))?;
                cs.emit(Bc::Push(idx));
            }
            Symbol::DotDot(_) => {
                cs.emit(Bc::GetVarDd(self.pool.intern(sym)?));
            }
            Symbol::Named(_) | Symbol::Dots => {
                cs.emit(Bc::GetVar(self.pool.intern(sym)?));
            }
        }
        Ok(())
    }

    fn compile_const(&self, cs: &mut CodeStream, constant: &Constant) -> CompileResult<()> {
        constant.mark_shared();
        let idx = self.pool.insert(constant.value().clone())?;
        cs.emit(Bc::Push(idx));
        Ok(())
    }
}

/// Rebuild the formal list from the optimized function.
///
/// Formals' promise code is not referenced from any instruction, so an
/// optimizer may legitimately have removed it. That is reported rather than
/// papered over: each default must still be found at its index.
fn reassemble_formals(
    function: &Function,
    formals: &[Formal],
    promises: &[FunIdx],
) -> CompileResult<Vec<CompiledFormal>> {
    formals
        .iter()
        .zip(promises)
        .map(|(formal, &idx)| {
            let default = if idx == MISSING_ARG_OFFSET {
                FormalDefault::Missing
            } else {
                let survived = function
                    .code(idx)
                    .and_then(|code| code.source())
                    .is_some_and(|source| source.is_identical(&formal.default));
                if !survived {
                    return Err(CompileError::FormalCodeDropped {
                        name: formal.name.clone(),
                        index: idx,
                    });
                }
                FormalDefault::Promise(idx)
            };
            Ok(CompiledFormal {
                name: formal.name.clone(),
                default,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::call_site::{CallSite, call_sites};
    use crate::bytecode::ir::Code;
    use crate::lang::node::EnvRef;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ops(function: &Function, idx: FunIdx) -> Vec<Bc> {
        function.code(idx).unwrap().ops().unwrap()
    }

    fn sym(pool: &ConstantPool, name: &str) -> u32 {
        pool.intern(&Symbol::named(name)).unwrap()
    }

    // =========================================================================
    // Calls
    // =========================================================================

    #[test]
    fn test_call_with_symbol_argument() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let call = Node::call(Node::sym("f"), vec![Arg::positional(Node::sym("x"))]);

        let top = Compiler::new(&pool).compile(&mut f, &call).unwrap();

        assert_eq!(top, 0);
        assert_eq!(f.len(), 2);
        assert_eq!(
            ops(&f, top),
            vec![Bc::GetFun(sym(&pool, "f")), Bc::MakePromise(1), Bc::Call(1), Bc::Ret]
        );
        assert_eq!(ops(&f, 1), vec![Bc::GetVar(sym(&pool, "x")), Bc::Ret]);
        assert_eq!(
            call_sites(f.code(top).unwrap(), &pool),
            vec![CallSite {
                offset: 8,
                args: vec![1],
                names: vec![ArgName::Unnamed],
            }]
        );
    }

    #[test]
    fn test_call_with_named_argument() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let call = Node::call(
            Node::sym("f"),
            vec![Arg::named("y", Node::literal(Value::Real(1.0)))],
        );

        let top = Compiler::new(&pool).compile(&mut f, &call).unwrap();

        let promise = ops(&f, 1);
        assert_eq!(promise.len(), 2);
        match promise[0] {
            Bc::Push(idx) => assert_eq!(pool.get(idx), Some(Value::Real(1.0))),
            other => panic!("expected push, got {:?}", other),
        }
        assert_eq!(promise[1], Bc::Ret);

        let body = ops(&f, top);
        assert!(matches!(body[2], Bc::CallNamed(_)));
        let sites = call_sites(f.code(top).unwrap(), &pool);
        assert_eq!(sites[0].args, vec![1]);
        assert_eq!(sites[0].names, vec![ArgName::Tag(Symbol::named("y"))]);
    }

    #[test]
    fn test_dots_argument_is_marked() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let call = Node::call(
            Node::sym("g"),
            vec![
                Arg::positional(Node::sym("a")),
                Arg::positional(Node::Symbol(Symbol::Dots)),
            ],
        );

        let top = Compiler::new(&pool).compile(&mut f, &call).unwrap();

        let sites = call_sites(f.code(top).unwrap(), &pool);
        assert_eq!(sites[0].names, vec![ArgName::Unnamed, ArgName::Dots]);
        let dots = pool.intern(&Symbol::Dots).unwrap();
        assert_eq!(ops(&f, 2), vec![Bc::GetVar(dots), Bc::Ret]);
    }

    #[test]
    fn test_non_symbol_callee_is_checked() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        // (g())(x)
        let inner = Node::call(Node::sym("g"), vec![]);
        let call = Node::call(inner, vec![Arg::positional(Node::sym("x"))]);

        let top = Compiler::new(&pool).compile(&mut f, &call).unwrap();

        assert_eq!(
            ops(&f, top),
            vec![
                Bc::GetFun(sym(&pool, "g")),
                Bc::Call(0),
                Bc::IsFun,
                Bc::MakePromise(1),
                Bc::Call(1),
                Bc::Ret,
            ]
        );
    }

    #[test]
    fn test_nested_call_arguments_get_their_own_promises() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        // f(g(x))
        let call = Node::call(
            Node::sym("f"),
            vec![Arg::positional(Node::call(
                Node::sym("g"),
                vec![Arg::positional(Node::sym("x"))],
            ))],
        );

        Compiler::new(&pool).compile(&mut f, &call).unwrap();

        assert_eq!(f.len(), 3);
        assert_eq!(
            ops(&f, 1),
            vec![Bc::GetFun(sym(&pool, "g")), Bc::MakePromise(2), Bc::Call(1), Bc::Ret]
        );
        assert_eq!(ops(&f, 2), vec![Bc::GetVar(sym(&pool, "x")), Bc::Ret]);
    }

    #[test]
    fn test_trivial_arguments_are_still_promises() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let call = Node::call(
            Node::sym("f"),
            vec![Arg::positional(Node::literal(Value::Integer(3)))],
        );
        Compiler::new(&pool).compile(&mut f, &call).unwrap();
        assert_eq!(f.len(), 2);
        assert!(matches!(ops(&f, 0)[1], Bc::MakePromise(1)));
    }

    #[test]
    fn test_call_records_its_ast() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let call = Node::call(Node::sym("f"), vec![Arg::positional(Node::sym("x"))]);
        let top = Compiler::new(&pool).compile(&mut f, &call).unwrap();

        let code = f.code(top).unwrap();
        let offset = call_sites(code, &pool)[0].offset;
        assert_eq!(code.ast_at(offset), Some(&call));
        assert_eq!(code.source(), Some(&call));
    }

    #[test]
    fn test_too_many_arguments() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let args = vec![Arg::positional(Node::sym("x")); MAX_NUM_ARGS + 1];
        let call = Node::call(Node::sym("f"), args);

        let err = Compiler::new(&pool).compile(&mut f, &call).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TooManyArguments { count, max } if count == MAX_NUM_ARGS + 1 && max == MAX_NUM_ARGS
        ));
    }

    #[test]
    fn test_configured_argument_limit() {
        let pool = ConstantPool::new();
        let compiler = Compiler::new(&pool).with_config(CompilerConfig {
            max_num_args: 2,
            ..CompilerConfig::default()
        });
        let call = |n| Node::call(Node::sym("f"), vec![Arg::positional(Node::sym("x")); n]);

        assert!(compiler.compile(&mut Function::new(), &call(2)).is_ok());
        assert!(matches!(
            compiler.compile(&mut Function::new(), &call(3)),
            Err(CompileError::TooManyArguments { count: 3, max: 2 })
        ));
    }

    #[test]
    fn test_code_table_overflow() {
        let pool = ConstantPool::new();
        let mut f = Function::with_limit(2);
        let call = Node::call(
            Node::sym("f"),
            vec![Arg::positional(Node::sym("x")), Arg::positional(Node::sym("y"))],
        );
        let err = Compiler::new(&pool).compile(&mut f, &call).unwrap_err();
        assert!(matches!(err, CompileError::TooManyCodes { max: 2 }));
    }

    #[test]
    fn test_pool_overflow() {
        let pool = ConstantPool::with_limit(1);
        let mut f = Function::new();
        let call = Node::call(Node::sym("f"), vec![Arg::positional(Node::sym("x"))]);
        let err = Compiler::new(&pool).compile(&mut f, &call).unwrap_err();
        assert!(matches!(err, CompileError::TooManyConstants { max: 1 }));
    }

    proptest! {
        #[test]
        fn prop_one_promise_per_argument(n in 0usize..40) {
            let pool = ConstantPool::new();
            let mut f = Function::new();
            let args = (0..n).map(|i| Arg::positional(Node::sym(format!("x{}", i)))).collect();
            let call = Node::call(Node::sym("f"), args);

            let top = Compiler::new(&pool).compile(&mut f, &call).unwrap();

            prop_assert_eq!(f.len(), n + 1);
            let sites = call_sites(f.code(top).unwrap(), &pool);
            prop_assert_eq!(sites.len(), 1);
            let mut promises = sites[0].args.clone();
            prop_assert_eq!(promises.len(), n);
            for &idx in &promises {
                let code = ops(&f, idx);
                prop_assert_eq!(code.last(), Some(&Bc::Ret));
            }
            promises.sort_unstable();
            promises.dedup();
            prop_assert_eq!(promises.len(), n);
        }
    }

    // =========================================================================
    // Symbols and constants
    // =========================================================================

    #[test]
    fn test_missing_argument_is_pushed() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let idx = Compiler::new(&pool).compile(&mut f, &Node::missing()).unwrap();
        match ops(&f, idx)[0] {
            Bc::Push(p) => assert_eq!(pool.get(p), Some(Value::Symbol(Symbol::Missing))),
            other => panic!("expected push, got {:?}", other),
        }
    }

    #[test]
    fn test_varargs_element_lookup() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let idx = Compiler::new(&pool)
            .compile(&mut f, &Node::Symbol(Symbol::DotDot(2)))
            .unwrap();
        let dd = pool.intern(&Symbol::DotDot(2)).unwrap();
        assert_eq!(ops(&f, idx), vec![Bc::GetVarDd(dd), Bc::Ret]);
    }

    #[test]
    fn test_literal_is_marked_on_every_push() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let constant = Arc::new(Constant::new(Value::Str("s".into())));
        let lit = Node::Literal(constant.clone());
        let call = Node::call(
            Node::sym("c"),
            vec![Arg::positional(lit.clone()), Arg::positional(lit)],
        );

        assert_eq!(constant.named(), 0);
        Compiler::new(&pool).compile(&mut f, &call).unwrap();

        assert_eq!(constant.named(), crate::lang::value::NAMED_MAX);
        let (first, second) = (ops(&f, 1)[0], ops(&f, 2)[0]);
        assert!(matches!(first, Bc::Push(_)));
        assert!(matches!(second, Bc::Push(_)));
        assert_ne!(first, second);
    }

    #[test]
    fn test_forced_promise_becomes_constant() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let idx = Compiler::new(&pool)
            .compile(&mut f, &Node::forced(Value::Integer(7)))
            .unwrap();
        match ops(&f, idx)[0] {
            Bc::Push(p) => assert_eq!(pool.get(p), Some(Value::Integer(7))),
            other => panic!("expected push, got {:?}", other),
        }
    }

    // =========================================================================
    // Contract violations
    // =========================================================================

    #[test]
    fn test_promise_with_environment_fails() {
        let pool = ConstantPool::new();
        let node = Node::Promise {
            value: Some(Arc::new(Constant::new(Value::Null))),
            env: Some(EnvRef(1)),
        };
        let err = Compiler::new(&pool)
            .compile(&mut Function::new(), &node)
            .unwrap_err();
        assert!(err.is_about(&node));
        assert!(err.to_string().contains("environment"));
    }

    #[test]
    fn test_unevaluated_promise_fails() {
        let pool = ConstantPool::new();
        let node = Node::Promise {
            value: None,
            env: None,
        };
        let err = Compiler::new(&pool)
            .compile(&mut Function::new(), &node)
            .unwrap_err();
        assert!(err.to_string().contains("evaluated"));
    }

    #[test]
    fn test_bytecode_in_argument_fails() {
        let pool = ConstantPool::new();
        let call = Node::call(Node::sym("f"), vec![Arg::positional(Node::Bytecode)]);
        let err = Compiler::new(&pool)
            .compile(&mut Function::new(), &call)
            .unwrap_err();
        assert!(err.is_about(&Node::Bytecode));
    }

    // =========================================================================
    // Formals and finalize
    // =========================================================================

    #[test]
    fn test_missing_default_takes_no_slot() {
        let pool = ConstantPool::new();
        let mut f = Function::new();
        let formals = vec![
            Formal::new("a", Node::literal(Value::Integer(1))),
            Formal::required("b"),
        ];

        let proms = Compiler::new(&pool).compile_formals(&mut f, &formals).unwrap();

        assert_eq!(proms, vec![0, MISSING_ARG_OFFSET]);
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn test_finalize_puts_body_in_slot_zero() {
        let pool = ConstantPool::new();
        let body = Node::call(Node::sym("f"), vec![Arg::positional(Node::sym("a"))]);
        let formals = vec![
            Formal::new("a", Node::literal(Value::Integer(1))),
            Formal::required("b"),
        ];

        let compiled = Compiler::new(&pool).finalize(&body, &formals).unwrap();
        let function = &compiled.function;

        // slot 0: body, slot 1: default of `a`, slot 2: argument of the call
        assert_eq!(function.len(), 3);
        assert_eq!(function.body().unwrap().source(), Some(&body));
        assert_eq!(ops(function, 0)[1], Bc::MakePromise(2));
        assert_eq!(
            compiled.formals,
            vec![
                CompiledFormal {
                    name: Symbol::named("a"),
                    default: FormalDefault::Promise(1),
                },
                CompiledFormal {
                    name: Symbol::named("b"),
                    default: FormalDefault::Missing,
                },
            ]
        );
        assert!(function.slots().all(|(_, c)| c.unwrap().stack_size().is_some()));
        assert_eq!(function.body().unwrap().stack_size().unwrap().max_stack, 2);
    }

    #[test]
    fn test_optimizer_runs_once() {
        let pool = ConstantPool::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let compiler = Compiler::new(&pool).with_optimizer(move |f: Function| {
            seen.fetch_add(1, Ordering::SeqCst);
            f
        });

        compiler.finalize(&Node::sym("x"), &[]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Keeps only the body, as a dead-code pass that does not know about
    /// formals would.
    fn drop_unreferenced(function: Function) -> Function {
        let mut codes = function.into_codes();
        let mut out = Function::new();
        let idx = out.next().unwrap();
        if let Some(body) = codes[0].take() {
            out.add_code(idx, body).unwrap();
        }
        out
    }

    #[test]
    fn test_dropped_formal_code_fails_loudly() {
        let pool = ConstantPool::new();
        let formals = vec![Formal::new("a", Node::literal(Value::Integer(1)))];

        let err = Compiler::new(&pool)
            .with_optimizer(drop_unreferenced)
            .finalize(&Node::sym("a"), &formals)
            .unwrap_err();

        assert!(matches!(
            err,
            CompileError::FormalCodeDropped { ref name, index: 1 } if *name == Symbol::named("a")
        ));
    }

    #[test]
    fn test_optimizer_output_is_reverified() {
        let pool = ConstantPool::new();
        let broken = |_: Function| {
            let mut f = Function::new();
            let idx = f.next().unwrap();
            f.add_code(idx, Code::from_ops(&[Bc::Drop, Bc::Ret])).unwrap();
            f
        };

        let err = Compiler::new(&pool)
            .with_optimizer(broken)
            .finalize(&Node::sym("x"), &[])
            .unwrap_err();
        assert!(matches!(err, CompileError::Verify(_)));
    }

    #[test]
    fn test_nan_default_survives_finalize() {
        let pool = ConstantPool::new();
        let formals = vec![Formal::new("a", Node::literal(Value::Real(f64::NAN)))];

        let compiled = Compiler::new(&pool)
            .finalize(&Node::sym("a"), &formals)
            .unwrap();

        assert_eq!(compiled.formals[0].default, FormalDefault::Promise(1));
        match ops(&compiled.function, 1)[0] {
            Bc::Push(p) => assert!(matches!(pool.get(p), Some(Value::Real(r)) if r.is_nan())),
            other => panic!("expected push, got {:?}", other),
        }
    }

    #[test]
    fn test_optimizer_must_keep_the_body() {
        let pool = ConstantPool::new();
        let err = Compiler::new(&pool)
            .with_optimizer(|_: Function| Function::new())
            .finalize(&Node::sym("x"), &[])
            .unwrap_err();
        assert!(matches!(err, CompileError::MissingBody));
    }

    #[test]
    fn test_finalize_rejects_bytecode_body() {
        let pool = ConstantPool::new();
        let err = Compiler::new(&pool)
            .finalize(&Node::Bytecode, &[])
            .unwrap_err();
        assert!(err.is_about(&Node::Bytecode));
    }
}
