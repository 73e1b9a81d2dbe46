//! Conditions, variables, arrays and property syntax.

use super::state::{ParseState, ValueContext};
use crate::{
    ast::{
        AnyToken, ArrayNode, ConditionNode, ConditionParts, ConditionValue, GroupNode,
        GroupPrefix, Node, Parens, PropertyNode, QuotePair, Separators, TokenType, ValidToken,
        VariableNode,
    },
    token::{Token, TokenKind},
};

/// Parses: condition → property_part? value | variable "(" or_expr ")"
pub(super) fn parse_condition(state: &mut ParseState<'_>) -> Node {
    let missing_property = state.missing(&[TokenType::Value]);
    if let Some(op) = take_property_operator(state) {
        return parse_property_condition(state, PropertyNode::Error(missing_property), op);
    }

    if let Some(left) = state.take(TokenKind::BracketL) {
        let array = parse_array(state, left);
        let context = state.context.clone();
        let value = check_array(state, array, &context);
        return Node::Condition(ConditionNode::from_parts(ConditionParts::new(value)));
    }

    if state.options().prefixable_groups && prefix_group_ahead(state) {
        let variable = parse_variable(state);
        let prefix = ConditionNode::from_parts(ConditionParts::new(ConditionValue::Variable(
            variable,
        )));
        return Node::Group(state.parse_group(Some(GroupPrefix::Condition(Box::new(prefix)))));
    }

    let variable = parse_variable(state);
    if !variable.is_regex()
        && let Some(op) = take_property_operator(state)
    {
        return parse_property_condition(state, PropertyNode::Variable(variable), op);
    }
    let context = state.context.clone();
    let value = check_regex(state, variable, &context);
    Node::Condition(ConditionNode::from_parts(ConditionParts::new(value)))
}

/// Returns true if token `at` is a prefixable string glued to an opening quote.
fn string_prefix_at(state: &ParseState<'_>, at: usize) -> bool {
    let tokens = state.remaining_from(at);
    match tokens {
        [prefix, quote, ..] => {
            prefix.kind == TokenKind::Value
                && matches!(quote.kind, TokenKind::Quote(_))
                && prefix.end == quote.start
                && state.options().is_prefixable_string(&prefix.value)
        }
        _ => false,
    }
}

/// Bounded lookahead: does a variable start here that is directly followed by `(`?
///
/// Looks at no more than five tokens: string prefix, quote, value, quote, paren.
fn prefix_group_ahead(state: &ParseState<'_>) -> bool {
    let mut at = state.index();
    if string_prefix_at(state, at) {
        at += 1;
    }
    let tokens = state.remaining_from(at);
    let consumed = match tokens {
        [first, rest @ ..] => match first.kind {
            TokenKind::Value => 1,
            TokenKind::Quote(quote) => match rest {
                [body, close, ..]
                    if body.kind == TokenKind::QuotedValue(quote)
                        && close.kind == TokenKind::Quote(quote) =>
                {
                    3
                }
                [close, ..] if close.kind == TokenKind::Quote(quote) => 2,
                _ => return false,
            },
            _ => return false,
        },
        [] => return false,
    };
    match (tokens.get(consumed - 1), tokens.get(consumed)) {
        (Some(last), Some(paren)) => paren.kind == TokenKind::ParenL && paren.start == last.end,
        _ => false,
    }
}

/// Parses: variable → prefix? (QUOTE body? QUOTE | "/" body? "/" flags? | VALUE)
pub(super) fn parse_variable(state: &mut ParseState<'_>) -> VariableNode {
    let prefix = if string_prefix_at(state, state.index()) {
        state.take(TokenKind::Value)
    } else {
        None
    };

    let Some(token) = state.peek() else {
        let value = AnyToken::Error(state.missing(&[TokenType::Value]));
        return VariableNode::new(prefix, value, None);
    };
    match token.kind {
        TokenKind::Quote(quote) => {
            let left = state.consume(token);
            parse_delimited(
                state,
                prefix,
                left,
                TokenKind::QuotedValue(quote),
                TokenKind::Quote(quote),
                quote.token_type(),
            )
        }
        TokenKind::RegexDelimiter => {
            let left = state.consume(token);
            parse_delimited(
                state,
                prefix,
                left,
                TokenKind::RegexBody,
                TokenKind::RegexDelimiter,
                TokenType::Regex,
            )
        }
        TokenKind::Value => {
            let value = state.consume(token);
            VariableNode::new(prefix, AnyToken::Valid(value), None)
        }
        _ => {
            let value = AnyToken::Error(state.missing(&[TokenType::Value]));
            VariableNode::new(prefix, value, None)
        }
    }
}

/// The body and closing delimiter of a quoted value or regex, after its opening delimiter.
fn parse_delimited(
    state: &mut ParseState<'_>,
    prefix: Option<ValidToken>,
    left: ValidToken,
    body: TokenKind,
    close: TokenKind,
    missing: TokenType,
) -> VariableNode {
    // An empty body is a valid, zero-width value.
    let value = state
        .take(body)
        .unwrap_or_else(|| state.synthetic(TokenType::Value));
    let right = match state.take(close) {
        Some(token) => AnyToken::Valid(token),
        None => AnyToken::Error(state.missing(&[missing])),
    };
    let flags = if close == TokenKind::RegexDelimiter && right.is_valid() {
        state.take(TokenKind::RegexFlags)
    } else {
        None
    };
    VariableNode::new(
        prefix,
        AnyToken::Valid(value),
        Some(QuotePair { left, right, flags }),
    )
}

/// Parses: array → "[" variable* "]", after the opening bracket.
fn parse_array(state: &mut ParseState<'_>, left: ValidToken) -> ArrayNode {
    let mut values = Vec::new();
    while matches!(
        state.peek_kind(),
        Some(TokenKind::Value | TokenKind::Quote(_))
    ) {
        values.push(parse_variable(state));
    }
    let right = match state.take(TokenKind::BracketR) {
        Some(right) => AnyToken::Valid(right),
        None => AnyToken::Error(state.missing(&[TokenType::BracketR])),
    };
    ArrayNode::new(left, values, right)
}

/// The token that turns a condition into a property condition.
enum PropertyOperator {
    /// Left separator of `prop:op:value`.
    Separator(ValidToken),
    /// Operator of `prop=value`.
    Custom(ValidToken),
}

/// Consumes the next token if it is a property operator.
fn take_property_operator(state: &mut ParseState<'_>) -> Option<PropertyOperator> {
    if let Some(sep) = state.take(TokenKind::ExpandedSep) {
        return Some(PropertyOperator::Separator(sep));
    }
    state.take(TokenKind::CustomOp).map(PropertyOperator::Custom)
}

/// Parses everything after the property operator: separators and value.
fn parse_property_condition(
    state: &mut ParseState<'_>,
    property: PropertyNode,
    op: PropertyOperator,
) -> Node {
    let property_text = property.text().map(str::to_owned);
    let mut parts = match op {
        PropertyOperator::Separator(sep) => parse_expanded_tail(state, sep, property_text),
        PropertyOperator::Custom(op) => parse_custom_tail(state, op, property_text),
    };
    parts.property = Some(property);
    Node::Condition(ConditionNode::from_parts(parts))
}

/// `prop=value`, after the operator.
fn parse_custom_tail(
    state: &mut ParseState<'_>,
    op: ValidToken,
    property: Option<String>,
) -> ConditionParts {
    let context = ValueContext {
        property,
        operator: Some(op.value.clone()),
    };
    let mut parts = ConditionParts::new(parse_property_value(state, &context));
    parts.property_operator = Some(AnyToken::Valid(op));
    parts
}

/// `prop:op:value` and its incomplete forms, after the left separator.
fn parse_expanded_tail(
    state: &mut ParseState<'_>,
    left: ValidToken,
    property: Option<String>,
) -> ConditionParts {
    let next = state.peek();
    let after = state.peek_at(1);

    if let Some(op) = next.filter(|t| t.kind == TokenKind::Value) {
        if after.is_some_and(|t| t.kind == TokenKind::ExpandedSep) {
            let op = state.consume(op);
            let right = state.take(TokenKind::ExpandedSep).map(AnyToken::Valid);
            let value = parse_property_value(state, &context(property, Some(&op)));
            return expanded(left, right, AnyToken::Valid(op), value);
        }
        if after.is_some_and(|t| opens_value(t) && t.start == op.end) {
            let op = state.consume(op);
            let value = parse_property_value(state, &context(property, Some(&op)));
            return expanded(left, None, AnyToken::Valid(op), value);
        }
    }

    if state.options().separator_is_custom_operator() {
        let op = ValidToken {
            kind: TokenType::OpCustom,
            ..left
        };
        return parse_custom_tail(state, op, property);
    }

    match next {
        Some(sep) if sep.kind == TokenKind::ExpandedSep => {
            let op = AnyToken::Error(state.missing(&[TokenType::Value]));
            let right = state.consume(sep);
            let value = parse_property_value(state, &context(property, None));
            expanded(left, Some(AnyToken::Valid(right)), op, value)
        }
        Some(op) if op.kind == TokenKind::Value => {
            let op = state.consume(op);
            let right = AnyToken::Error(state.missing(&[TokenType::OpExpandedSep]));
            let value = ConditionValue::Error(state.missing(&[TokenType::Value]));
            expanded(left, Some(right), AnyToken::Valid(op), value)
        }
        _ => {
            let op = AnyToken::Error(state.missing(&[TokenType::Value]));
            let value = if next.is_some_and(opens_value) {
                parse_property_value(state, &context(property, None))
            } else {
                ConditionValue::Error(state.missing(&[TokenType::Value]))
            };
            expanded(left, None, op, value)
        }
    }
}

/// Returns true for `(` and `[`.
fn opens_value(token: &Token) -> bool {
    matches!(token.kind, TokenKind::ParenL | TokenKind::BracketL)
}

/// Value context for a property and an optional operator token.
fn context(property: Option<String>, operator: Option<&ValidToken>) -> ValueContext {
    ValueContext {
        property,
        operator: operator.map(|op| op.value.clone()),
    }
}

/// Parts of an expanded property condition.
fn expanded(
    left: ValidToken,
    right: Option<AnyToken>,
    operator: AnyToken,
    value: ConditionValue,
) -> ConditionParts {
    let mut parts = ConditionParts::new(value);
    parts.sep = Some(Separators {
        left: Some(AnyToken::Valid(left)),
        right,
    });
    parts.property_operator = Some(operator);
    parts
}

/// Parses: value → variable | array | "(" sub-parse ")"
fn parse_property_value(state: &mut ParseState<'_>, context: &ValueContext) -> ConditionValue {
    if let Some(open) = state.peek().filter(|t| t.kind == TokenKind::ParenL) {
        return ConditionValue::Group(parse_value_group(state, open, context));
    }
    if let Some(left) = state.take(TokenKind::BracketL) {
        let array = parse_array(state, left);
        return check_array(state, array, context);
    }
    match state.peek_kind() {
        Some(TokenKind::Value | TokenKind::Quote(_) | TokenKind::RegexDelimiter) => {
            let variable = parse_variable(state);
            check_regex(state, variable, context)
        }
        _ => ConditionValue::Error(state.missing(&[TokenType::Value])),
    }
}

/// A parenthesized property value starting at `open`, the next token. The text between the
/// parens is parsed by the property value parser, which does not know property syntax, so
/// properties cannot nest.
fn parse_value_group(
    state: &mut ParseState<'_>,
    open: &Token,
    context: &ValueContext,
) -> GroupNode {
    let start = state.index();
    let tokens = state.remaining_from(start);
    let mut depth = 0usize;
    let mut close = None;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::ParenL => depth += 1,
            TokenKind::ParenR => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let left = state.consume(open);
    let fragment_end = close
        .and_then(|i| tokens.get(i))
        .map_or_else(|| state.raw_len(), |t| t.start);
    let fragment = state.raw_slice(open.end, fragment_end);
    let expression = state.parser.property_value_parser().parse_fragment(
        fragment,
        state.to_original(open.end),
        context.clone(),
    );
    state.set_last_end(expression.pos().end);

    let right = match close.and_then(|i| tokens.get(i).map(|t| (i, t))) {
        Some((i, token)) => {
            state.jump_to(start + i);
            AnyToken::Valid(state.consume(token))
        }
        None => {
            state.jump_to(start + tokens.len());
            AnyToken::Error(state.missing(&[TokenType::ParenR]))
        }
    };
    GroupNode::new(
        None,
        expression,
        Some(Parens {
            left: Some(left),
            right,
        }),
    )
}

/// Replaces a regex the regex policy rejects with a plain value.
fn check_regex(
    state: &ParseState<'_>,
    variable: VariableNode,
    context: &ValueContext,
) -> ConditionValue {
    if variable.is_regex()
        && !state
            .options()
            .regex_values
            .allows(context.property.as_deref(), context.operator.as_deref())
    {
        return ConditionValue::Variable(state.literal(variable.pos()));
    }
    ConditionValue::Variable(variable)
}

/// Replaces an array the array policy rejects with a plain value.
fn check_array(state: &ParseState<'_>, array: ArrayNode, context: &ValueContext) -> ConditionValue {
    if state
        .options()
        .array_values
        .allows(context.property.as_deref(), context.operator.as_deref())
    {
        ConditionValue::Array(array)
    } else {
        ConditionValue::Variable(state.literal(array.pos()))
    }
}
