use std::path::PathBuf;
use std::sync::Arc;

use phpls_lsp::completion::{CTagsProvider, CompletionProvider, CompletionRequest};
use phpls_lsp::{Completer, CompletionItem, CompletionItemKind, Config, DocumentRegistry, Error, ResolvedType, Scalar, SyntaxDocument};
use lsp_types::Documentation;
use phpls_parser::parse_completion_target;
use pretty_assertions::assert_eq;
use rstest::rstest;

const BASE: &str = "<?php
namespace App;

class Base
{
    public const OPEN = 1;
    private const CLOSED = 2;

    public static $visible;
    protected static $shared;
    private static $hidden;

    public $name;

    public static function make() {}

    private static function secret() {}
}
";

fn tags_fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/tags-fixture")
}

fn completer(sources: &[(&str, &str)]) -> Result<Completer, Error> {
    let registry = Arc::new(DocumentRegistry::new());
    for (uri, source) in sources {
        registry.add(SyntaxDocument::parse(*uri, source, 1)?);
    }
    let config = Config {
        project_root: Some(tags_fixture()),
        ..Config::default()
    };
    Ok(Completer::from_config(registry, &config))
}

/// Complete at the `|` marker of `text`.
fn complete_at(completer: &Completer, uri: &str, text: &str) -> Vec<CompletionItem> {
    let cursor = text.find('|').unwrap_or(text.len());
    let source = text.replacen('|', "", 1);
    completer.complete(uri, &source, cursor)
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|item| item.label.as_str()).collect()
}

fn documentation(item: &CompletionItem) -> Option<&str> {
    match &item.documentation {
        Some(Documentation::String(text)) => Some(text.as_str()),
        Some(Documentation::MarkupContent(markup)) => Some(markup.value.as_str()),
        None => None,
    }
}

#[test]
fn this_completes_methods_then_properties_then_doc_tags() -> Result<(), Error> {
    let completer = completer(&[])?;
    let text = "<?php
namespace App;

/**
 * @property int $bar Bar
 */
class Foo
{
    /** The name. */
    protected ?string $name = null;

    public function __construct() {}

    public function baz(int $x, $y): string {}

    public static function create(): static {}

    public function run()
    {
        $this->|
    }
}
";
    let items = complete_at(&completer, "file:///app/Foo.php", text);
    assert_eq!(labels(&items), vec!["baz", "run", "name", "bar"]);

    let baz = items.first();
    assert_eq!(baz.and_then(|item| item.detail.as_deref()), Some("public baz(int $x, $y): string"));
    assert_eq!(baz.and_then(|item| item.insert_text.as_deref()), Some("baz"));

    let name = items.get(2);
    assert_eq!(name.and_then(|item| item.detail.as_deref()), Some("?string"));
    assert_eq!(name.and_then(documentation), Some("/** The name. */"));

    let bar = items.get(3);
    assert_eq!(
        bar.map(|item| (item.kind, item.detail.as_deref(), documentation(item))),
        Some((Some(CompletionItemKind::PROPERTY), Some("int"), Some("Bar")))
    );
    Ok(())
}

#[test]
fn doc_tag_properties_also_resolve() -> Result<(), Error> {
    let completer = completer(&[])?;
    let source = "<?php
/**
 * @property int $bar Bar
 */
class Foo
{
    public function run()
    {
        return $this->bar;
    }
}
";
    let document = SyntaxDocument::parse("file:///Foo.php", source, 1)?;
    let offset = source.find("->bar").map_or(0, |index| index + 1);
    assert_eq!(
        completer.resolver().type_at(&document, offset),
        ResolvedType::Scalar(Scalar::Int)
    );
    Ok(())
}

#[test]
fn variables_complete_through_their_assignment() -> Result<(), Error> {
    let completer = completer(&[("file:///app/Base.php", BASE)])?;
    let text = "<?php
use App\\Base;

$base = new Base();
$base->|
";
    let items = complete_at(&completer, "file:///app/index.php", text);
    assert_eq!(labels(&items), vec!["name"]);
    Ok(())
}

#[test]
fn chained_calls_complete_on_the_return_type() -> Result<(), Error> {
    let completer = completer(&[("file:///app/Base.php", BASE)])?;
    let text = "<?php
namespace App;

class Factory
{
    public function base(): Base {}

    public function run()
    {
        $this->base()->|
    }
}
";
    let items = complete_at(&completer, "file:///app/Factory.php", text);
    assert_eq!(labels(&items), vec!["name"]);
    Ok(())
}

#[rstest]
#[case::self_access("Base", "self::$|", &["visible", "shared", "hidden"])]
#[case::static_access("Base", "static::$|", &["visible", "shared", "hidden"])]
#[case::own_name("Base", "Base::$|", &["visible", "shared", "hidden"])]
#[case::parent_access("Child extends Base", "parent::$|", &["visible", "shared"])]
#[case::other_class("Other", "Base::$|", &["visible"])]
fn static_property_visibility(
    #[case] header: &str,
    #[case] access: &str,
    #[case] expected: &[&str],
) -> Result<(), Error> {
    let completer = completer(&[("file:///app/Base.php", BASE)])?;
    let text = if header == "Base" {
        BASE.replace(
            "    private static function secret() {}",
            &format!("    private static function secret()\n    {{\n        return {access}\n    }}"),
        )
    } else {
        format!(
            "<?php
namespace App;

class {header}
{{
    public function run()
    {{
        return {access}
    }}
}}
"
        )
    };
    let uri = if header == "Base" { "file:///app/Base.php" } else { "file:///app/Other.php" };
    let items = complete_at(&completer, uri, &text);
    assert_eq!(labels(&items), expected.to_vec());
    assert!(items.iter().all(|item| item.kind == Some(CompletionItemKind::PROPERTY)));
    Ok(())
}

#[test]
fn class_access_lists_methods_properties_and_constants_in_order() -> Result<(), Error> {
    let completer = completer(&[("file:///app/Base.php", BASE)])?;
    let text = "<?php
namespace App;

function run()
{
    return Base::|
}
";
    let items = complete_at(&completer, "file:///app/run.php", text);
    assert_eq!(labels(&items), vec!["make", "visible", "OPEN"]);
    assert_eq!(
        items.iter().map(|item| item.kind).collect::<Vec<_>>(),
        vec![
            Some(CompletionItemKind::METHOD),
            Some(CompletionItemKind::PROPERTY),
            Some(CompletionItemKind::CONSTANT),
        ]
    );
    Ok(())
}

#[rstest]
#[case::call_argument("$x = strlen($this->|")]
#[case::condition("if ($this->|")]
#[case::nested("return in_array($a, [1, $this->|")]
#[case::statement("$this->|")]
fn unfinished_lines_still_complete(#[case] line: &str) -> Result<(), Error> {
    let completer = completer(&[])?;
    let text = format!(
        "<?php
namespace App;

class Foo
{{
    public $bar;

    public function go()
    {{
        {line}
    }}
}}
"
    );
    let items = complete_at(&completer, "file:///app/Unsaved.php", &text);
    assert_eq!(labels(&items), vec!["go", "bar"]);
    Ok(())
}

#[test]
fn unknown_receivers_complete_nothing() -> Result<(), Error> {
    let completer = completer(&[])?;
    let items = complete_at(&completer, "file:///a.php", "<?php\n$nobody->|\n");
    assert!(items.is_empty());
    let items = complete_at(&completer, "file:///a.php", "<?php\nMissing::|\n");
    assert!(items.is_empty());
    Ok(())
}

#[test]
fn bare_names_complete_from_the_tags_index() -> Result<(), Error> {
    let completer = completer(&[])?;
    let items = complete_at(&completer, "file:///a.php", "<?php\n$x = new Abstract|\n");
    assert_eq!(
        labels(&items),
        vec![
            "AbstractArrayAnnotation",
            "AbstractBenchmark",
            "AbstractExecutor",
            "AbstractLogger",
            "AbstractProvider",
        ]
    );
    Ok(())
}

fn name_target(name: &str) -> Option<phpls_parser::Expr> {
    let source = format!("<?php\n{name}");
    parse_completion_target(&source, source.len())
}

#[test]
fn ctags_needs_an_index() -> Result<(), Error> {
    let directory = tempfile::tempdir()?;
    let provider = CTagsProvider::new(directory.path(), 3);
    assert!(name_target("foo").is_some_and(|target| !provider.supports(&target)));
    Ok(())
}

#[test]
fn ctags_needs_a_minimum_keyword_length() {
    let provider = CTagsProvider::new(tags_fixture(), 3);
    assert!(name_target("f").is_some_and(|target| !provider.supports(&target)));
    assert!(name_target("fo").is_some_and(|target| !provider.supports(&target)));
    assert!(name_target("foo").is_some_and(|target| provider.supports(&target)));
    assert!(name_target("$foo->").is_some_and(|target| !provider.supports(&target)));
}

#[test]
fn ctags_completes_classes_and_interfaces() -> Result<(), Error> {
    let provider = CTagsProvider::new(tags_fixture(), 3);
    let document = SyntaxDocument::parse("file:///a.php", "<?php\n", 0)?;
    let Some(target) = name_target("Abstract") else {
        return Err(Error::DocumentNotFound("no target".into()));
    };
    let items = provider.complete(&CompletionRequest {
        document: &document,
        expression: &target,
        receiver: None,
    });

    let first = items.first();
    assert_eq!(first.map(|item| item.label.as_str()), Some("AbstractArrayAnnotation"));
    assert_eq!(
        first.and_then(|item| item.detail.as_deref()),
        Some("PhpBench\\Benchmark\\Metadata\\Annotations")
    );
    assert_eq!(first.map(|item| item.kind), Some(Some(CompletionItemKind::CLASS)));
    assert!(items.iter().all(|item| {
        item.kind == Some(CompletionItemKind::CLASS) || item.kind == Some(CompletionItemKind::INTERFACE)
    }));

    let Some(target) = name_target("Logger") else {
        return Err(Error::DocumentNotFound("no target".into()));
    };
    let items = provider.complete(&CompletionRequest {
        document: &document,
        expression: &target,
        receiver: None,
    });
    assert_eq!(
        items.iter().map(|item| (item.label.as_str(), item.kind)).collect::<Vec<_>>(),
        vec![("LoggerInterface", Some(CompletionItemKind::INTERFACE))]
    );
    Ok(())
}
