use super::{
    EntityStyle, LLDB_EXPRESSIONS_MODULE_PREFIX, NodePrinter, OBJC_MODULE, PrintResult, PrintingError, STDLIB_MODULE,
    TypePrinting, child, missing_child, need_space_before_type, text,
};
use crate::node::{Kind, Node};
use crate::options::DemangleFlags;

impl NodePrinter<'_> {
    /// Prints a declaration with its name, its type and, when allowed, its context.
    ///
    /// When `as_prefix_context` is set and the entity cannot be used as a dotted prefix, nothing is printed and the
    /// entity itself is returned. Otherwise the returned node is a context that the caller must print as a postfix.
    pub(super) fn print_entity<'n, 'a>(
        &mut self,
        entity: &'n Node<'a>,
        as_prefix_context: bool,
        style: EntityStyle<'_>,
    ) -> PrintResult<Option<&'n Node<'a>>> {
        let (entity, generic_arguments) = if entity.kind() == Kind::BoundGenericFunction {
            (child(entity, 0)?, Some(child(entity, 1)?))
        } else {
            (entity, None)
        };

        let mut extra_name = style.extra_name;
        let mut extra_index = style.extra_index;

        let multi_word_name = extra_name.contains(' ')
            || (self.flag(DemangleFlags::DISPLAY_LOCAL_NAME_CONTEXTS)
                && style.has_name
                && entity.child(1).is_some_and(|name| name.kind() == Kind::LocalDeclName));

        if as_prefix_context && (style.type_printing != TypePrinting::NoType || multi_word_name) {
            return Ok(Some(entity));
        }

        let mut postfix_context = None;
        let context = child(entity, 0)?;

        if self.should_print_context(context) {
            if multi_word_name {
                postfix_context = Some(context);
            } else {
                let position = self.out.len();

                postfix_context = self.print_node(context, true)?;

                if self.out.len() != position {
                    self.write_char('.');
                }
            }
        }

        if style.has_name || !style.overwrite_name.is_empty() {
            if !extra_name.is_empty() && multi_word_name {
                self.write(extra_name);

                if let Some(number) = extra_index {
                    self.write_number(number)?;
                }

                self.write(" of ");
                extra_name = "";
                extra_index = None;
            }

            let position = self.out.len();

            if style.overwrite_name.is_empty() {
                let name = child(entity, 1)?;

                if name.kind() != Kind::PrivateDeclName {
                    self.print(name)?;
                }

                if let Some(private_name) = entity.child_of_kind(Kind::PrivateDeclName) {
                    self.print(private_name)?;
                }
            } else {
                self.write(style.overwrite_name);
            }

            if self.out.len() != position && !extra_name.is_empty() {
                self.write_char('.');
            }
        }

        if !extra_name.is_empty() {
            self.write(extra_name);

            if let Some(number) = extra_index {
                self.write_number(number)?;
            }
        }

        if style.type_printing != TypePrinting::NoType {
            let ty = child(
                entity
                    .child_of_kind(Kind::Type)
                    .ok_or_else(|| missing_child(entity, entity.num_children()))?,
                0,
            )?;

            let mut type_printing = style.type_printing;

            if type_printing == TypePrinting::FunctionStyle {
                let mut inner = ty;

                while inner.kind() == Kind::DependentGenericType {
                    inner = child(child(inner, 1)?, 0)?;
                }

                if !matches!(
                    inner.kind(),
                    Kind::FunctionType
                        | Kind::NoEscapeFunctionType
                        | Kind::UncurriedFunctionType
                        | Kind::CFunctionPointer
                        | Kind::ThinFunctionType
                ) {
                    type_printing = TypePrinting::WithColon;
                }
            }

            if type_printing == TypePrinting::WithColon {
                if self.flag(DemangleFlags::DISPLAY_ENTITY_TYPES) {
                    self.write(" : ");
                    self.print_entity_type(entity, ty, generic_arguments)?;
                }
            } else {
                if multi_word_name || need_space_before_type(ty) {
                    self.write_char(' ');
                }

                self.print_entity_type(entity, ty, generic_arguments)?;
            }
        }

        if !as_prefix_context && let Some(context) = postfix_context {
            if matches!(
                entity.kind(),
                Kind::DefaultArgumentInitializer
                    | Kind::Initializer
                    | Kind::PropertyWrapperBackingInitializer
                    | Kind::PropertyWrapperInitFromProjectedValue
            ) {
                self.write(" of ");
            } else {
                self.write(" in ");
            }

            self.print(context)?;

            return Ok(None);
        }

        Ok(postfix_context)
    }

    fn print_entity_type(&mut self, entity: &Node, ty: &Node, generic_arguments: Option<&Node>) -> PrintResult {
        let labels = entity.child_of_kind(Kind::LabelList).map(AsRef::as_ref);

        if labels.is_none() && generic_arguments.is_none() {
            return self.print(ty);
        }

        if let Some(arguments) = generic_arguments {
            self.write_char('<');
            self.print_children(arguments, ", ")?;
            self.write_char('>');
        }

        let mut function_type = ty;

        if ty.kind() == Kind::DependentGenericType {
            if generic_arguments.is_none() {
                self.print(child(ty, 0)?)?;
            }

            let dependent_type = child(ty, 1)?;

            if need_space_before_type(dependent_type) {
                self.write_char(' ');
            }

            function_type = child(dependent_type, 0)?;
        }

        self.print_function_type(labels, function_type)
    }

    /// Prints the variable or subscript an accessor belongs to, followed by the accessor name.
    pub(super) fn print_abstract_storage<'n, 'a>(
        &mut self,
        storage: &'n Node<'a>,
        as_prefix_context: bool,
        accessor: &str,
    ) -> PrintResult<Option<&'n Node<'a>>> {
        match storage.kind() {
            Kind::Variable => self.print_entity(
                storage,
                as_prefix_context,
                EntityStyle::named(TypePrinting::WithColon).extra(accessor, None),
            ),
            Kind::Subscript => self.print_entity(
                storage,
                as_prefix_context,
                EntityStyle::unnamed(TypePrinting::WithColon)
                    .extra(accessor, None)
                    .overwrite("subscript"),
            ),
            kind => Err(PrintingError::UnexpectedKind { kind }),
        }
    }

    pub(super) fn should_print_context(&self, context: &Node) -> bool {
        if !self.flag(DemangleFlags::QUALIFY_ENTITIES) {
            return false;
        }

        if context.kind() == Kind::Module
            && let Some(module) = context.text()
        {
            if module == STDLIB_MODULE {
                return self.flag(DemangleFlags::DISPLAY_STDLIB_MODULE);
            }

            if module == OBJC_MODULE {
                return self.flag(DemangleFlags::DISPLAY_OBJC_MODULE);
            }

            if self.options.is_hidden_module(module) {
                return false;
            }

            if module.starts_with(LLDB_EXPRESSIONS_MODULE_PREFIX) {
                return self.flag(DemangleFlags::DISPLAY_DEBUGGER_GENERATED_MODULE);
            }
        }

        true
    }

    pub(super) fn print_extension(&mut self, extension: &Node) -> PrintResult {
        if self.flag(DemangleFlags::QUALIFY_ENTITIES) && self.flag(DemangleFlags::DISPLAY_EXTENSION_CONTEXTS) {
            self.write("(extension in ");
            self.print_node(child(extension, 0)?, true)?;
            self.write("):");
        }

        self.print(child(extension, 1)?)?;

        if let Some(signature) = extension.child(2)
            && !self.flag(DemangleFlags::PRINT_FOR_TYPE_NAME)
        {
            self.print(signature)?;
        }

        Ok(())
    }

    pub(super) fn print_private_decl_name(&mut self, name: &Node) -> PrintResult {
        let show_discriminator = self.flag(DemangleFlags::SHOW_PRIVATE_DISCRIMINATORS);
        let discriminator = text(child(name, 0)?)?;

        if let Some(identifier) = name.child(1) {
            if show_discriminator {
                self.write_char('(');
            }

            self.print(identifier)?;

            if show_discriminator {
                self.write(" in ");
                self.write(discriminator);
                self.write_char(')');
            }
        } else if show_discriminator {
            self.write("(in ");
            self.write(discriminator);
            self.write_char(')');
        }

        Ok(())
    }
}
