use super::{NodePrinter, PrintResult, PrintingError, child, missing_child, text};
use crate::kinds::{FunctionSigSpecializationParamKind as ParamKind, MangledDifferentiabilityKind};
use crate::node::{Kind, Node, Payload};
use crate::options::DemangleFlags;

pub(super) const fn param_kind_name(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::BoxToValue => "Value Promoted from Box",
        ParamKind::BoxToStack => "Stack Promoted from Box",
        ParamKind::InOutToOut => "InOut Converted to Out",
        ParamKind::ConstantPropFunction => "Constant Propagated Function",
        ParamKind::ConstantPropGlobal => "Constant Propagated Global",
        ParamKind::ConstantPropInteger => "Constant Propagated Integer",
        ParamKind::ConstantPropFloat => "Constant Propagated Float",
        ParamKind::ConstantPropString => "Constant Propagated String",
        ParamKind::ConstantPropKeyPath => "Constant Propagated KeyPath",
        ParamKind::ClosureProp => "Closure Propagated",
    }
}

fn base_param_kind(param: &Node) -> PrintResult<Option<ParamKind>> {
    let kind = child(param, 0)?;

    match kind.payload() {
        Payload::SpecializationParamKind(raw) => Ok(raw.base()),
        _ => Err(PrintingError::InvalidPayload { kind: kind.kind() }),
    }
}

impl NodePrinter<'_> {
    /// Prints the `generic specialization <...> of ` header of a specialized symbol, or a single `specialized `
    /// when specializations are not displayed.
    pub(super) fn print_specialization_prefix(
        &mut self,
        specialization: &Node,
        description: &str,
        param_prefix: &str,
    ) -> PrintResult {
        if !self.flag(DemangleFlags::DISPLAY_GENERIC_SPECIALIZATIONS) {
            if !self.specialization_prefix_printed {
                self.write("specialized ");
                self.specialization_prefix_printed = true;
            }

            return Ok(());
        }

        self.write(description);
        self.write(" <");

        let mut separator = "";
        let mut argument_number = 0_u64;

        for item in specialization.children() {
            match item.kind() {
                Kind::SpecializationPassID => {}
                Kind::IsSerialized => {
                    self.write(separator);
                    separator = ", ";
                    self.print(item)?;
                }
                kind => {
                    if item.num_children() != 0 {
                        self.write(separator);
                        self.write(param_prefix);
                        separator = ", ";

                        match kind {
                            Kind::FunctionSignatureSpecializationParam => {
                                self.write("Arg[");
                                self.write_number(argument_number)?;
                                self.write("] = ");
                                self.print_function_signature_specialization_param(item)?;
                            }
                            Kind::FunctionSignatureSpecializationReturn => {
                                self.write("Return = ");
                                self.print_function_signature_specialization_param(item)?;
                            }
                            _ => self.print(item)?,
                        }
                    }

                    argument_number += 1;
                }
            }
        }

        self.write("> of ");

        Ok(())
    }

    fn print_function_signature_specialization_param(&mut self, param: &Node) -> PrintResult {
        let children = param.children();

        match base_param_kind(param)? {
            Some(ParamKind::ConstantPropFunction | ParamKind::ConstantPropGlobal) => {
                self.write_char('[');
                self.print(child(param, 0)?)?;
                self.write(" : ");
                self.print(child(param, 1)?)?;
                self.write_char(']');
            }
            Some(ParamKind::ConstantPropInteger | ParamKind::ConstantPropFloat) => {
                self.write_char('[');
                self.print(child(param, 0)?)?;
                self.write(" : ");
                self.write(text(child(param, 1)?)?);
                self.write_char(']');
            }
            Some(ParamKind::ConstantPropString) => {
                self.write_char('[');
                self.print(child(param, 0)?)?;
                self.write(" : ");
                self.write(text(child(param, 1)?)?);
                self.write_char('\'');

                if let Some(value) = param.child(2) {
                    self.write(text(value)?);
                }

                self.write("']");
            }
            Some(ParamKind::ConstantPropKeyPath) => {
                self.write_char('[');
                self.print(child(param, 0)?)?;
                self.write(" : ");
                self.print(child(param, 1)?)?;
                self.write_char('<');
                self.print_sequence(&children[2..], ",")?;
                self.write(">]");
            }
            Some(ParamKind::ClosureProp) => {
                self.write_char('[');
                self.print(child(param, 0)?)?;
                self.write(" : ");
                self.print(child(param, 1)?)?;
                self.write(", Argument Types : [");

                let argument_types = children[2..]
                    .iter()
                    .take_while(|argument| argument.kind() == Kind::Type)
                    .count();

                self.print_sequence(&children[2..2 + argument_types], ", ")?;
                self.write("]]");
            }
            Some(ParamKind::BoxToValue | ParamKind::BoxToStack | ParamKind::InOutToOut) | None => {
                self.print(child(param, 0)?)?;
            }
        }

        Ok(())
    }

    pub(super) fn print_reabstraction_thunk(&mut self, thunk: &Node) -> PrintResult {
        if self.flag(DemangleFlags::SHORTEN_THUNK) {
            self.write("thunk for ");

            return self.print(child(thunk, thunk.num_children().saturating_sub(1))?);
        }

        self.write("reabstraction thunk ");

        if thunk.kind() == Kind::ReabstractionThunkHelper {
            self.write("helper ");
        }

        let mut first_type = 0;

        if thunk.num_children() == 3 {
            self.print(child(thunk, 0)?)?;
            self.write_char(' ');
            first_type = 1;
        }

        self.write("from ");
        self.print(child(thunk, first_type + 1)?)?;
        self.write(" to ");
        self.print(child(thunk, first_type)?)
    }

    pub(super) fn print_reabstraction_thunk_with_self(&mut self, thunk: &Node) -> PrintResult {
        self.write("reabstraction thunk ");

        let mut first_type = 0;

        if thunk.num_children() == 4 {
            self.print(child(thunk, 0)?)?;
            self.write_char(' ');
            first_type = 1;
        }

        self.write("from ");
        self.print(child(thunk, first_type + 2)?)?;
        self.write(" to ");
        self.print(child(thunk, first_type + 1)?)?;
        self.write(" self ");
        self.print(child(thunk, first_type)?)
    }

    pub(super) fn print_key_path_accessor(&mut self, thunk: &Node) -> PrintResult {
        if thunk.kind() == Kind::KeyPathGetterThunkHelper {
            self.write("key path getter for ");
        } else {
            self.write("key path setter for ");
        }

        self.print(child(thunk, 0)?)?;
        self.write(" : ");

        for item in &thunk.children()[1..] {
            if item.kind() == Kind::IsSerialized {
                self.write(", ");
            }

            self.print(item)?;
        }

        Ok(())
    }

    pub(super) fn print_key_path_hash(&mut self, thunk: &Node) -> PrintResult {
        if thunk.kind() == Kind::KeyPathEqualsThunkHelper {
            self.write("key path index equality operator for ");
        } else {
            self.write("key path index hash operator for ");
        }

        let mut types = thunk.children();
        let is_serialized = types.last().is_some_and(|last| last.kind() == Kind::IsSerialized);

        if is_serialized {
            types = &types[..types.len() - 1];
        }

        if let Some((signature, rest)) = types.split_last()
            && signature.kind() == Kind::DependentGenericSignature
        {
            self.print(signature)?;
            types = rest;
        }

        self.write_char('(');
        self.print_sequence(types, ", ")?;
        self.write_char(')');

        if is_serialized {
            self.write(", serialized");
        }

        Ok(())
    }

    pub(super) fn print_auto_diff_function(&mut self, function: &Node) -> PrintResult {
        let children = function.children();
        let prefix_end = children
            .iter()
            .position(|item| item.kind() == Kind::AutoDiffFunctionKind)
            .ok_or_else(|| missing_child(function, children.len()))?;

        if function.kind() == Kind::AutoDiffDerivativeVTableThunk {
            self.write("vtable thunk for ");
        }

        self.print(child(function, prefix_end)?)?;
        self.write(" of ");

        let mut prefix = &children[..prefix_end];
        let mut signature = None;

        if let Some((last, rest)) = prefix.split_last()
            && last.kind() == Kind::DependentGenericSignature
        {
            signature = Some(last);
            prefix = rest;
        }

        self.print_sequence(prefix, "")?;

        if self.flag(DemangleFlags::SHORTEN_THUNK) {
            return Ok(());
        }

        self.write(" with respect to parameters ");
        self.print(child(function, prefix_end + 1)?)?;
        self.write(" and results ");
        self.print(child(function, prefix_end + 2)?)?;

        if let Some(signature) = signature
            && self.flag(DemangleFlags::DISPLAY_WHERE_CLAUSES)
        {
            self.write(" with ");
            self.print(signature)?;
        }

        Ok(())
    }

    pub(super) fn print_auto_diff_self_reordering_thunk(&mut self, thunk: &Node) -> PrintResult {
        self.write("autodiff self-reordering reabstraction thunk ");

        let from = child(thunk, 0)?;
        let to = child(thunk, 1)?;

        self.write("for ");

        if self.flag(DemangleFlags::SHORTEN_THUNK) {
            return self.print(from);
        }

        let mut kind_index = 2;
        let signature = thunk
            .child(2)
            .filter(|signature| signature.kind() == Kind::DependentGenericSignature);

        if signature.is_some() {
            kind_index = 3;
        }

        self.print(child(thunk, kind_index)?)?;

        if let Some(signature) = signature {
            self.print(signature)?;
            self.write_char(' ');
        }

        self.write(" from ");
        self.print(from)?;
        self.write(" to ");
        self.print(to)
    }

    pub(super) fn print_auto_diff_subset_parameters_thunk(&mut self, thunk: &Node) -> PrintResult {
        self.write("autodiff subset parameters thunk for ");

        let children = thunk.children();

        if children.len() < 5 {
            return Err(missing_child(thunk, children.len()));
        }

        let (prefix, tail) = children.split_at(children.len() - 4);
        let [kind, parameters, results, to_parameters] = tail else {
            return Err(PrintingError::UnexpectedKind { kind: thunk.kind() });
        };

        let mut prefix = prefix;
        let mut signature = None;

        if let Some((last, rest)) = prefix.split_last()
            && last.kind() == Kind::DependentGenericSignature
        {
            signature = Some(last);
            prefix = rest;
        }

        self.print(kind)?;
        self.write(" from ");
        self.print_sequence(prefix, "")?;

        if self.flag(DemangleFlags::SHORTEN_THUNK) {
            return Ok(());
        }

        self.write(" with respect to parameters ");
        self.print(parameters)?;
        self.write(" and results ");
        self.print(results)?;
        self.write(" to parameters ");
        self.print(to_parameters)?;

        if let Some(signature) = signature
            && self.flag(DemangleFlags::DISPLAY_WHERE_CLAUSES)
        {
            self.write(" of type ");
            self.print(signature)?;
        }

        Ok(())
    }

    pub(super) fn print_differentiability_witness(&mut self, witness: &Node) -> PrintResult {
        let children = witness.children();
        let kind_index = children
            .iter()
            .position(|item| item.kind() == Kind::Index)
            .ok_or_else(|| missing_child(witness, children.len()))?;

        let Payload::Differentiability(kind) = children[kind_index].payload() else {
            return Err(PrintingError::InvalidPayload { kind: witness.kind() });
        };

        self.write(match kind {
            MangledDifferentiabilityKind::Forward => "forward-mode",
            MangledDifferentiabilityKind::Reverse => "reverse-mode",
            MangledDifferentiabilityKind::Normal => "normal",
            MangledDifferentiabilityKind::Linear => "linear",
            MangledDifferentiabilityKind::NonDifferentiable => return Err(PrintingError::InvalidDifferentiability),
        });

        self.write(" differentiability witness for ");
        self.print_sequence(&children[..kind_index], "")?;
        self.write(" with respect to parameters ");
        self.print(child(witness, kind_index + 1)?)?;
        self.write(" and results ");
        self.print(child(witness, kind_index + 2)?)?;

        if let Some(signature) = witness.child(kind_index + 3) {
            self.write(" with ");
            self.print(signature)?;
        }

        Ok(())
    }

    pub(super) fn print_index_subset(&mut self, subset: &Node) -> PrintResult {
        self.write_char('{');

        let positions = text(subset)?
            .bytes()
            .enumerate()
            .filter_map(|(i, flag)| (flag == b'S').then_some(i));

        for (n, position) in positions.enumerate() {
            if n != 0 {
                self.write(", ");
            }

            self.write_number(u64::try_from(position).unwrap_or(u64::MAX))?;
        }

        self.write_char('}');

        Ok(())
    }
}
