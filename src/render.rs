//! Canonical text rendering for instructions and expressions.
//!
//! Rendering is the `string_representation` extension getter: behavior
//! attached to the node-class hierarchy from outside the AST definitions
//! and resolved through the dispatch registry. Payload-carrying commands
//! register leaf handlers; nullary commands inherit a family handler that
//! renders the leaf class name; whole families (breakpoints, watchpoints,
//! `do`, `let`) register one handler at the family slot so their leaves
//! exercise the superclass walk.

use crate::ast::{Expr, ExprKind, Instruction, InstructionKind, PathSegment, VarPath};
use crate::dispatch::{ClassId, ClassRegistry, MessageTable};

type InstrGetter = fn(&Renderer, &Instruction) -> String;
type ExprGetter = fn(&Renderer, &Expr) -> String;

struct InstructionClasses {
    continue_cmd: ClassId,
    help_cmd: ClassId,
    step_cmd: ClassId,
    history_cmd: ClassId,
    variables_cmd: ClassId,
    load_cmd: ClassId,
    break_add: ClassId,
    break_list: ClassId,
    break_delete: ClassId,
    break_delete_all: ClassId,
    watch_add: ClassId,
    watch_list: ClassId,
    watch_delete: ClassId,
    watch_delete_all: ClassId,
    do_cmd: ClassId,
    do_not: ClassId,
    do_not_all: ClassId,
    do_plain: ClassId,
    let_cmd: ClassId,
    let_unconstructed: ClassId,
    unlet_cmd: ClassId,
    display_cmd: ClassId,
    print_cmd: ClassId,
    list_source: ClassId,
    if_cmd: ClassId,
}

struct ExprClasses {
    bool_lit: ClassId,
    int_lit: ClassId,
    uint_lit: ClassId,
    float_lit: ClassId,
    str_lit: ClassId,
    char_lit: ClassId,
    enum_lit: ClassId,
    type_lit: ClassId,
    path_ref: ClassId,
    unary: ClassId,
    binary: ClassId,
    paren: ClassId,
    call: ClassId,
    exists: ClassId,
    typeof_conv: ClassId,
    mapof_conv: ClassId,
    listof_conv: ClassId,
    list_ctor: ClassId,
    map_ctor: ClassId,
    struct_ctor: ClassId,
    set_ctor: ClassId,
}

pub struct Renderer {
    registry: ClassRegistry,
    instructions: InstructionClasses,
    exprs: ExprClasses,
    instr_repr: MessageTable<InstrGetter>,
    expr_repr: MessageTable<ExprGetter>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        let mut registry = ClassRegistry::new();

        let instruction = registry.register("instruction", None);
        let nullary = registry.register("nullary-instruction", Some(instruction));
        let breakpoint = registry.register("breakpoint-instruction", Some(instruction));
        let watchpoint = registry.register("watchpoint-instruction", Some(instruction));
        let do_family = registry.register("do-instruction", Some(instruction));
        let let_family = registry.register("let-instruction", Some(instruction));
        let instructions = InstructionClasses {
            // Nullary leaf names double as the rendered command words.
            continue_cmd: registry.register("continue", Some(nullary)),
            help_cmd: registry.register("help", Some(nullary)),
            step_cmd: registry.register("step", Some(nullary)),
            history_cmd: registry.register("history", Some(nullary)),
            variables_cmd: registry.register("variables", Some(nullary)),
            load_cmd: registry.register("load", Some(instruction)),
            break_add: registry.register("breakpoint-add", Some(breakpoint)),
            break_list: registry.register("breakpoint-list", Some(breakpoint)),
            break_delete: registry.register("breakpoint-delete", Some(breakpoint)),
            break_delete_all: registry.register("breakpoint-delete-all", Some(breakpoint)),
            watch_add: registry.register("watchpoint-add", Some(watchpoint)),
            watch_list: registry.register("watchpoint-list", Some(watchpoint)),
            watch_delete: registry.register("watchpoint-delete", Some(watchpoint)),
            watch_delete_all: registry.register("watchpoint-delete-all", Some(watchpoint)),
            do_cmd: registry.register("do-inner", Some(do_family)),
            do_not: registry.register("do-not", Some(do_family)),
            do_not_all: registry.register("do-not-all", Some(do_family)),
            do_plain: registry.register("do-plain", Some(do_family)),
            let_cmd: registry.register("let", Some(let_family)),
            let_unconstructed: registry.register("let-unconstructed", Some(let_family)),
            unlet_cmd: registry.register("unlet", Some(let_family)),
            display_cmd: registry.register("display", Some(instruction)),
            print_cmd: registry.register("print", Some(instruction)),
            list_source: registry.register("list-source", Some(instruction)),
            if_cmd: registry.register("if", Some(instruction)),
        };

        let expression = registry.register("expression", None);
        let literal = registry.register("literal-expression", Some(expression));
        let conversion = registry.register("conversion-expression", Some(expression));
        let ctor = registry.register("constructor-expression", Some(expression));
        let exprs = ExprClasses {
            bool_lit: registry.register("bool-literal", Some(literal)),
            int_lit: registry.register("int-literal", Some(literal)),
            uint_lit: registry.register("uint-literal", Some(literal)),
            float_lit: registry.register("float-literal", Some(literal)),
            str_lit: registry.register("string-literal", Some(literal)),
            char_lit: registry.register("char-literal", Some(literal)),
            enum_lit: registry.register("enum-literal", Some(literal)),
            type_lit: registry.register("type-literal", Some(literal)),
            path_ref: registry.register("path-expression", Some(expression)),
            unary: registry.register("unary-expression", Some(expression)),
            binary: registry.register("binary-expression", Some(expression)),
            paren: registry.register("paren-expression", Some(expression)),
            call: registry.register("call-expression", Some(expression)),
            exists: registry.register("exists-expression", Some(expression)),
            typeof_conv: registry.register("typeof-expression", Some(conversion)),
            mapof_conv: registry.register("mapof-expression", Some(conversion)),
            listof_conv: registry.register("listof-expression", Some(conversion)),
            list_ctor: registry.register("list-constructor", Some(ctor)),
            map_ctor: registry.register("map-constructor", Some(ctor)),
            struct_ctor: registry.register("struct-constructor", Some(ctor)),
            set_ctor: registry.register("set-constructor", Some(ctor)),
        };

        let instr_repr: MessageTable<InstrGetter> = MessageTable::new("string_representation");
        instr_repr.register(nullary, nullary_repr);
        instr_repr.register(breakpoint, breakpoint_repr);
        instr_repr.register(watchpoint, watchpoint_repr);
        instr_repr.register(do_family, do_repr);
        instr_repr.register(let_family, let_repr);
        instr_repr.register(instructions.load_cmd, load_repr);
        instr_repr.register(instructions.display_cmd, display_repr);
        instr_repr.register(instructions.print_cmd, print_repr);
        instr_repr.register(instructions.list_source, list_source_repr);
        instr_repr.register(instructions.if_cmd, if_repr);

        let expr_repr: MessageTable<ExprGetter> = MessageTable::new("string_representation");
        expr_repr.register(literal, literal_repr);
        expr_repr.register(conversion, conversion_repr);
        expr_repr.register(ctor, ctor_repr);
        expr_repr.register(exprs.path_ref, path_repr);
        expr_repr.register(exprs.unary, unary_repr);
        expr_repr.register(exprs.binary, binary_repr);
        expr_repr.register(exprs.paren, paren_repr);
        expr_repr.register(exprs.call, call_repr);
        expr_repr.register(exprs.exists, exists_repr);

        Self {
            registry,
            instructions,
            exprs,
            instr_repr,
            expr_repr,
        }
    }

    pub fn instruction_text(&self, instruction: &Instruction) -> String {
        let class = self.instruction_class(&instruction.kind);
        let getter = self.instr_repr.resolve(&self.registry, class);
        getter(self, instruction)
    }

    pub fn expr_text(&self, expr: &Expr) -> String {
        let class = self.expr_class(&expr.kind);
        let getter = self.expr_repr.resolve(&self.registry, class);
        getter(self, expr)
    }

    pub fn path_text(&self, path: &VarPath) -> String {
        let mut out = String::new();
        for segment in &path.segments {
            match segment {
                PathSegment::Field { name } => {
                    if !out.is_empty() {
                        out.push_str("::");
                    }
                    out.push_str(name);
                }
                PathSegment::Index { name, index } => {
                    if !out.is_empty() {
                        out.push_str("::");
                    }
                    out.push_str(name);
                    out.push('[');
                    out.push_str(&self.expr_text(index));
                    out.push(']');
                }
                PathSegment::Subscript { index } => {
                    out.push('[');
                    out.push_str(&self.expr_text(index));
                    out.push(']');
                }
            }
        }
        out
    }

    fn instruction_class(&self, kind: &InstructionKind) -> ClassId {
        let classes = &self.instructions;
        match kind {
            InstructionKind::Continue => classes.continue_cmd,
            InstructionKind::Help => classes.help_cmd,
            InstructionKind::Step => classes.step_cmd,
            InstructionKind::History => classes.history_cmd,
            InstructionKind::Variables => classes.variables_cmd,
            InstructionKind::Load { .. } => classes.load_cmd,
            InstructionKind::BreakpointAdd { .. } => classes.break_add,
            InstructionKind::BreakpointList => classes.break_list,
            InstructionKind::BreakpointDelete { .. } => classes.break_delete,
            InstructionKind::BreakpointDeleteAll => classes.break_delete_all,
            InstructionKind::WatchpointAdd { .. } => classes.watch_add,
            InstructionKind::WatchpointList => classes.watch_list,
            InstructionKind::WatchpointDelete { .. } => classes.watch_delete,
            InstructionKind::WatchpointDeleteAll => classes.watch_delete_all,
            InstructionKind::Do { .. } => classes.do_cmd,
            InstructionKind::DoNot { .. } => classes.do_not,
            InstructionKind::DoNotAll => classes.do_not_all,
            InstructionKind::DoPlain => classes.do_plain,
            InstructionKind::Let { .. } => classes.let_cmd,
            InstructionKind::LetUnconstructed { .. } => classes.let_unconstructed,
            InstructionKind::Unlet { .. } => classes.unlet_cmd,
            InstructionKind::Display { .. } => classes.display_cmd,
            InstructionKind::Print { .. } => classes.print_cmd,
            InstructionKind::ListSource { .. } => classes.list_source,
            InstructionKind::If { .. } => classes.if_cmd,
        }
    }

    fn expr_class(&self, kind: &ExprKind) -> ClassId {
        let classes = &self.exprs;
        match kind {
            ExprKind::Bool(_) => classes.bool_lit,
            ExprKind::Int(_) => classes.int_lit,
            ExprKind::Uint(_) => classes.uint_lit,
            ExprKind::Float(_) => classes.float_lit,
            ExprKind::Str(_) => classes.str_lit,
            ExprKind::Char(_) => classes.char_lit,
            ExprKind::EnumLiteral { .. } => classes.enum_lit,
            ExprKind::TypeLiteral { .. } => classes.type_lit,
            ExprKind::Path(_) => classes.path_ref,
            ExprKind::Unary { .. } => classes.unary,
            ExprKind::Binary { .. } => classes.binary,
            ExprKind::Paren(_) => classes.paren,
            ExprKind::Call { .. } => classes.call,
            ExprKind::Exists { .. } => classes.exists,
            ExprKind::Typeof(_) => classes.typeof_conv,
            ExprKind::Mapof(_) => classes.mapof_conv,
            ExprKind::Listof(_) => classes.listof_conv,
            ExprKind::ListCtor(_) => classes.list_ctor,
            ExprKind::MapCtor(_) => classes.map_ctor,
            ExprKind::StructCtor(_) => classes.struct_ctor,
            ExprKind::SetCtor(_) => classes.set_ctor,
        }
    }

    fn block_text(&self, body: &[Instruction]) -> String {
        body.iter()
            .map(|instruction| self.instruction_text(instruction))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn list_text(&self, items: &[Expr]) -> String {
        items
            .iter()
            .map(|item| self.expr_text(item))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ----- instruction getters -----

/// Family handler for argument-less commands: the leaf class name is the
/// command word.
fn nullary_repr(renderer: &Renderer, instruction: &Instruction) -> String {
    let class = renderer.instruction_class(&instruction.kind);
    renderer.registry.name(class).to_string()
}

fn breakpoint_repr(_renderer: &Renderer, instruction: &Instruction) -> String {
    match &instruction.kind {
        InstructionKind::BreakpointAdd { file_name, line } => {
            format!("break \"{file_name}:{line}\"")
        }
        InstructionKind::BreakpointList => "break".to_string(),
        InstructionKind::BreakpointDelete { index } => format!("break not {index}"),
        InstructionKind::BreakpointDeleteAll => "break not all".to_string(),
        other => unreachable!("breakpoint handler dispatched for {other:?}"),
    }
}

fn watchpoint_repr(renderer: &Renderer, instruction: &Instruction) -> String {
    match &instruction.kind {
        InstructionKind::WatchpointAdd { expr } => {
            format!("watch {}", renderer.expr_text(expr))
        }
        InstructionKind::WatchpointList => "watch".to_string(),
        InstructionKind::WatchpointDelete { index } => format!("watch not {index}"),
        InstructionKind::WatchpointDeleteAll => "watch not all".to_string(),
        other => unreachable!("watchpoint handler dispatched for {other:?}"),
    }
}

fn do_repr(renderer: &Renderer, instruction: &Instruction) -> String {
    match &instruction.kind {
        InstructionKind::Do { inner } => format!("do {}", renderer.instruction_text(inner)),
        InstructionKind::DoNot { count } => format!("do not {count}"),
        InstructionKind::DoNotAll => "do not all".to_string(),
        InstructionKind::DoPlain => "do".to_string(),
        other => unreachable!("do handler dispatched for {other:?}"),
    }
}

fn let_repr(renderer: &Renderer, instruction: &Instruction) -> String {
    match &instruction.kind {
        InstructionKind::Let { path, op, expr } => format!(
            "let {} {} {}",
            renderer.path_text(path),
            op.symbol(),
            renderer.expr_text(expr)
        ),
        InstructionKind::LetUnconstructed { path } => {
            format!("let {}", renderer.path_text(path))
        }
        InstructionKind::Unlet { path } => format!("unlet {}", renderer.path_text(path)),
        other => unreachable!("let handler dispatched for {other:?}"),
    }
}

fn load_repr(_renderer: &Renderer, instruction: &Instruction) -> String {
    match &instruction.kind {
        InstructionKind::Load { file_name } => format!("load \"{file_name}\""),
        other => unreachable!("load handler dispatched for {other:?}"),
    }
}

fn display_repr(renderer: &Renderer, instruction: &Instruction) -> String {
    match &instruction.kind {
        InstructionKind::Display { path } => format!("display {}", renderer.path_text(path)),
        other => unreachable!("display handler dispatched for {other:?}"),
    }
}

fn print_repr(renderer: &Renderer, instruction: &Instruction) -> String {
    match &instruction.kind {
        InstructionKind::Print { expr } => format!("print {}", renderer.expr_text(expr)),
        other => unreachable!("print handler dispatched for {other:?}"),
    }
}

fn list_source_repr(_renderer: &Renderer, instruction: &Instruction) -> String {
    match &instruction.kind {
        InstructionKind::ListSource { window } => format!("list {window}"),
        other => unreachable!("list handler dispatched for {other:?}"),
    }
}

fn if_repr(renderer: &Renderer, instruction: &Instruction) -> String {
    match &instruction.kind {
        InstructionKind::If { arms, else_body } => {
            let mut out = String::new();
            for (position, (condition, body)) in arms.iter().enumerate() {
                let keyword = if position == 0 { "if" } else { " elseif" };
                out.push_str(keyword);
                out.push(' ');
                out.push_str(&renderer.expr_text(condition));
                out.push_str(" then ");
                out.push_str(&renderer.block_text(body));
            }
            if !else_body.is_empty() {
                out.push_str(" else ");
                out.push_str(&renderer.block_text(else_body));
            }
            out.push_str(" endif");
            out
        }
        other => unreachable!("if handler dispatched for {other:?}"),
    }
}

// ----- expression getters -----

/// Family handler for all literal leaves.
fn literal_repr(_renderer: &Renderer, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Bool(value) => value.to_string(),
        ExprKind::Int(value) => value.to_string(),
        ExprKind::Uint(value) => format!("0x{value:X}"),
        ExprKind::Float(value) => value.to_string(),
        ExprKind::Str(value) => format!("\"{}\"", escape_text(value)),
        ExprKind::Char(value) => format!("'{}'", escape_char(*value)),
        ExprKind::EnumLiteral { type_name, member } => format!("@{type_name}::{member}"),
        ExprKind::TypeLiteral { type_name } => format!("@{type_name}"),
        other => unreachable!("literal handler dispatched for {other:?}"),
    }
}

fn conversion_repr(renderer: &Renderer, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Typeof(inner) => format!("typeof({})", renderer.expr_text(inner)),
        ExprKind::Mapof(inner) => format!("mapof({})", renderer.expr_text(inner)),
        ExprKind::Listof(inner) => format!("listof({})", renderer.expr_text(inner)),
        other => unreachable!("conversion handler dispatched for {other:?}"),
    }
}

fn ctor_repr(renderer: &Renderer, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::ListCtor(items) => format!("@({})", renderer.list_text(items)),
        ExprKind::MapCtor(entries) => {
            let body = entries
                .iter()
                .map(|(key, value)| {
                    format!("{} : {}", renderer.expr_text(key), renderer.expr_text(value))
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("@[{body}]")
        }
        ExprKind::StructCtor(fields) => {
            let body = fields
                .iter()
                .map(|(name, value)| format!("{name} = {}", renderer.expr_text(value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("@{{{body}}}")
        }
        ExprKind::SetCtor(items) => format!("@!{}!", renderer.list_text(items)),
        other => unreachable!("constructor handler dispatched for {other:?}"),
    }
}

fn path_repr(renderer: &Renderer, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Path(path) => renderer.path_text(path),
        other => unreachable!("path handler dispatched for {other:?}"),
    }
}

fn unary_repr(renderer: &Renderer, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Unary { op, operand } => {
            format!("{}{}", op.symbol(), renderer.expr_text(operand))
        }
        other => unreachable!("unary handler dispatched for {other:?}"),
    }
}

fn binary_repr(renderer: &Renderer, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Binary { op, left, right } => format!(
            "{} {} {}",
            renderer.expr_text(left),
            op.symbol(),
            renderer.expr_text(right)
        ),
        other => unreachable!("binary handler dispatched for {other:?}"),
    }
}

fn paren_repr(renderer: &Renderer, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Paren(inner) => format!("({})", renderer.expr_text(inner)),
        other => unreachable!("paren handler dispatched for {other:?}"),
    }
}

fn call_repr(renderer: &Renderer, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Call { name, args } => format!("{name}({})", renderer.list_text(args)),
        other => unreachable!("call handler dispatched for {other:?}"),
    }
}

fn exists_repr(renderer: &Renderer, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Exists { path, default } => match default {
            Some(default) => format!(
                "exists({}, {})",
                renderer.path_text(path),
                renderer.expr_text(default)
            ),
            None => format!("exists({})", renderer.path_text(path)),
        },
        other => unreachable!("exists handler dispatched for {other:?}"),
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out
}

fn escape_char(c: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '\'' => "\\'".to_string(),
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\r' => "\\r".to_string(),
        '\0' => "\\0".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::lexer::tokenize;
    use crate::parser::parse_instruction;

    fn round_trip(renderer: &Renderer, input: &str) -> String {
        let mut diags = Diagnostics::new();
        let tokens = tokenize(input, &mut diags);
        let instruction = parse_instruction(&tokens, &mut diags)
            .unwrap_or_else(|error| panic!("parse failed for {input:?}: {error}"));
        renderer.instruction_text(&instruction)
    }

    #[test]
    fn canonical_command_round_trips() {
        let renderer = Renderer::new();
        let cases = [
            "continue",
            "step",
            "history",
            "variables",
            "break",
            "break \"foo.oil:42\"",
            "break not 3",
            "break not all",
            "watch counter > 10",
            "watch not all",
            "do print x",
            "do not all",
            "let x := 1 + 2",
            "let buffer[0] += 16",
            "let scratch",
            "unlet scratch",
            "display tasks[2]::name",
            "print typeof(x)",
            "list 10",
            "load \"app.oil\"",
        ];
        for case in cases {
            assert_eq!(round_trip(&renderer, case), case, "round trip for {case}");
        }
    }

    #[test]
    fn nullary_commands_inherit_the_family_renderer() {
        let renderer = Renderer::new();
        // No leaf handler exists for `continue`; the nullary family handler
        // resolves through the superclass walk and renders the class name.
        assert_eq!(round_trip(&renderer, "continue"), "continue");
        assert_eq!(round_trip(&renderer, "help"), "help");
    }

    #[test]
    fn repeated_rendering_does_not_rewalk_the_chain() {
        let renderer = Renderer::new();
        let first = round_trip(&renderer, "step");
        let walks = renderer.instr_repr.chain_walks();
        let second = round_trip(&renderer, "step");
        assert_eq!(first, second);
        assert_eq!(renderer.instr_repr.chain_walks(), walks);
    }

    #[test]
    fn deprecated_spellings_render_canonically() {
        let renderer = Renderer::new();
        assert_eq!(round_trip(&renderer, "print 1 . 2"), "print 1 + 2");
        assert_eq!(round_trip(&renderer, "print emptylist"), "print @()");
        assert_eq!(
            round_trip(&renderer, "print elementcount(x)"),
            "print size(x)"
        );
    }

    #[test]
    fn expression_forms_render() {
        let renderer = Renderer::new();
        let cases = [
            "print 1 + 2 * 3",
            "print (1 + 2) * 3",
            "print not armed and ready",
            "print @OsTask::Ready",
            "print @(1, 2)",
            "print @[1 : \"a\"]",
            "print @{mode = 1}",
            "print @!1, 2!",
            "print exists(cfg::timeout, 50)",
            "print \"a\\tb\"",
            "print 'x'",
            "print 0x1F",
        ];
        for case in cases {
            assert_eq!(round_trip(&renderer, case), case, "round trip for {case}");
        }
    }

    #[test]
    fn if_command_renders_with_arms() {
        let renderer = Renderer::new();
        let text = round_trip(
            &renderer,
            "if armed then continue; step elseif idle then print 1 else help endif",
        );
        assert_eq!(
            text,
            "if armed then continue; step elseif idle then print 1 else help endif"
        );
    }
}
