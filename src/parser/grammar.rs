//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::{self, Token};

/// Parse a group file
///
/// Malformed definitions are skipped and reported; everything that parsed is
/// returned alongside the errors.
pub fn parse_group_file(input: &str) -> (Option<GroupFile>, Vec<ParseError>) {
    let len = input.len();
    let (tokens, lex_errors) = lexer::lex(input);
    let mut errors: Vec<ParseError> = lex_errors
        .into_iter()
        .map(|span| ParseError::unrecognized(span, input))
        .collect();

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream =
        Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    let (output, parse_errors) = group_parser().parse(token_stream).into_output_errors();
    errors.extend(parse_errors.into_iter().map(ParseError::from));

    let group = output.map(|(group, trailing)| {
        if let Some(span) = trailing {
            errors.push(ParseError::syntax(
                span,
                "Unexpected input after the last definition",
            ));
        }
        group
    });
    (group, errors)
}

/// Parse a template file holding exactly one definition
pub fn parse_template_file(input: &str) -> Result<TemplateDef, Vec<ParseError>> {
    let len = input.len();
    let (tokens, lex_errors) = lexer::lex(input);
    let mut errors: Vec<ParseError> = lex_errors
        .into_iter()
        .map(|span| ParseError::unrecognized(span, input))
        .collect();

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream =
        Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    match template_def()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
    {
        Ok(def) if errors.is_empty() => Ok(def),
        Ok(_) => Err(errors),
        Err(errs) => {
            errors.extend(errs.into_iter().map(ParseError::from));
            Err(errors)
        }
    }
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn identifier<'a, I>() -> impl Parser<'a, I, Spanned<String>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! {
        Token::Ident(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())))
}

fn string_literal<'a, I>(
) -> impl Parser<'a, I, Spanned<String>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! {
        Token::String(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())))
}

/// `name(arg, arg = "default") ::= "body"` with `<<...>>` and `<%...%>` bodies
fn template_def<'a, I>() -> impl Parser<'a, I, TemplateDef, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let formal_arg = identifier()
        .then(just(Token::Equals).ignore_then(string_literal()).or_not())
        .map(|(name, default)| FormalArg { name, default });

    let formal_args = formal_arg
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

    let body = select! {
        Token::String(s) => s,
        Token::BigString(s) => s,
        Token::RawString(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    identifier()
        .then(formal_args)
        .then_ignore(just(Token::Define))
        .then(body)
        .map(|((name, args), body)| TemplateDef { name, args, body })
}

/// `name ::= [ "key" : "value", default : "value" ]`
fn dictionary_def<'a, I>(
) -> impl Parser<'a, I, DictionaryDef, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let entry = choice((
        just(Token::Default)
            .ignore_then(just(Token::Colon))
            .ignore_then(string_literal())
            .map(DictEntry::Default),
        string_literal()
            .then_ignore(just(Token::Colon))
            .then(string_literal())
            .map(|(key, value)| DictEntry::Pair(key, value)),
    ));

    identifier()
        .then_ignore(just(Token::Define))
        .then(
            entry
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose)),
        )
        .map(|(name, entries)| DictionaryDef::from_entries(name, entries))
}

/// Group file plus the span of the first token no definition could consume
fn group_parser<'a, I>(
) -> impl Parser<'a, I, (GroupFile, Option<Span>), extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let delimiters = just(Token::Delimiters)
        .ignore_then(string_literal())
        .then_ignore(just(Token::Comma))
        .then(string_literal())
        .map_with(|(start, stop), e| {
            Spanned::new((start.node, stop.node), span_range(&e.span()))
        });

    let import = just(Token::Import).ignore_then(string_literal());

    // A broken definition skips tokens until the next one parses
    let definition = choice((
        template_def().map(Definition::Template),
        dictionary_def().map(Definition::Dictionary),
    ))
    .map_with(|d, e| Spanned::new(d, span_range(&e.span())))
    .recover_with(skip_then_retry_until(any().ignored(), end()));

    let trailing = any()
        .map_with(|_, e| span_range(&e.span()))
        .repeated()
        .collect::<Vec<_>>()
        .map(|spans| spans.into_iter().next());

    delimiters
        .or_not()
        .then(import.repeated().collect::<Vec<_>>())
        .then(definition.repeated().collect::<Vec<_>>())
        .then(trailing)
        .then_ignore(end())
        .map(|(((delimiters, imports), definitions), trailing)| {
            (
                GroupFile {
                    delimiters,
                    imports,
                    definitions,
                },
                trailing,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn template(def: &Spanned<Definition>) -> &TemplateDef {
        match &def.node {
            Definition::Template(t) => t,
            other => panic!("Expected template, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_group_with_two_templates() {
        let source = r#"
            header(title) ::= "<h1><title></h1>"
            footer() ::= <<
            bye
            >>
        "#;
        let (group, errors) = parse_group_file(source);
        assert!(errors.is_empty(), "errors: {:?}", errors);
        let group = group.expect("Should parse");
        assert_eq!(group.definitions.len(), 2);

        let header = template(&group.definitions[0]);
        assert_eq!(header.name.node, "header");
        assert_eq!(header.args.len(), 1);
        assert_eq!(header.args[0].name.node, "title");
        assert_eq!(header.body.node, "<h1><title></h1>");

        let footer = template(&group.definitions[1]);
        assert_eq!(footer.name.node, "footer");
        assert!(footer.args.is_empty());
        assert_eq!(footer.body.node.trim(), "bye");
    }

    #[test]
    fn test_parse_header() {
        let source = r##"
            delimiters "$", "#"
            import "shared"
            import "lib/common.stg"
            t() ::= "$x#"
        "##;
        let (group, errors) = parse_group_file(source);
        assert!(errors.is_empty(), "errors: {:?}", errors);
        let group = group.expect("Should parse");
        let delimiters = group.delimiters.expect("Should have delimiters");
        assert_eq!(delimiters.node, ("$".to_string(), "#".to_string()));
        let imports: Vec<_> = group.imports.iter().map(|i| i.node.as_str()).collect();
        assert_eq!(imports, vec!["shared", "lib/common.stg"]);
        assert_eq!(group.definitions.len(), 1);
    }

    #[test]
    fn test_parse_default_arguments() {
        let (group, errors) = parse_group_file(r#"row(cells, sep = ", ") ::= "<cells>""#);
        assert!(errors.is_empty(), "errors: {:?}", errors);
        let group = group.expect("Should parse");
        let row = template(&group.definitions[0]);
        assert!(row.args[0].default.is_none());
        assert_eq!(
            row.args[1].default.as_ref().map(|d| d.node.as_str()),
            Some(", ")
        );
    }

    #[test]
    fn test_parse_dictionary() {
        let source = r#"
            typeInit ::= [ "int" : "0", "bool" : "false", default : "null" ]
        "#;
        let (group, errors) = parse_group_file(source);
        assert!(errors.is_empty(), "errors: {:?}", errors);
        let group = group.expect("Should parse");
        match &group.definitions[0].node {
            Definition::Dictionary(d) => {
                assert_eq!(d.name.node, "typeInit");
                assert_eq!(d.entries.len(), 2);
                assert_eq!(d.entries[1].0.node, "bool");
                assert_eq!(d.default.as_ref().map(|v| v.node.as_str()), Some("null"));
            }
            other => panic!("Expected dictionary, got {:?}", other),
        }
    }

    #[test]
    fn test_recovers_after_malformed_definition() {
        let source = r#"
            a() ::= "x"
            b( ::= "y"
            c() ::= "z"
        "#;
        let (group, errors) = parse_group_file(source);
        assert!(!errors.is_empty());
        let group = group.expect("Should recover");
        let names: Vec<_> = group
            .definitions
            .iter()
            .map(|d| d.node.name().node.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_reports_trailing_garbage() {
        let (group, errors) = parse_group_file(r#"a() ::= "x" )"#);
        assert!(!errors.is_empty());
        assert!(group.is_some());
    }

    #[test]
    fn test_parse_template_file() {
        let def = parse_template_file("button(label) ::= <<\n<button><label></button>\n>>")
            .expect("Should parse");
        assert_eq!(def.name.node, "button");
        assert_eq!(def.body.node, "<button><label></button>");
    }

    #[test]
    fn test_template_file_rejects_second_definition() {
        let result = parse_template_file(r#"a() ::= "x" b() ::= "y""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_template_file_lex_error() {
        let result = parse_template_file(r#"a() ::= "x" ?"#);
        let errors = result.unwrap_err();
        assert!(errors[0].message().contains("Unrecognized"));
    }
}
