use std::sync::Arc;

use phpls_lsp::{DocumentRegistry, Error, Reflector, ResolvedType, Scalar, SyntaxDocument, TypeResolver};
use phpls_parser::Node;
use pretty_assertions::assert_eq;
use rstest::rstest;

const USER: &str = include_str!("fixtures/User.php");
const REPOSITORY: &str = include_str!("fixtures/Repository.php");

struct Session {
    registry: Arc<DocumentRegistry>,
    resolver: TypeResolver,
}

impl Session {
    fn new(sources: &[(&str, &str)]) -> Result<Self, Error> {
        let registry = Arc::new(DocumentRegistry::new());
        for (uri, source) in sources {
            registry.add(SyntaxDocument::parse(*uri, source, 1)?);
        }
        let resolver = TypeResolver::new(Arc::new(Reflector::for_registry(Arc::clone(&registry))));
        Ok(Self { registry, resolver })
    }

    fn with_fixtures() -> Result<Self, Error> {
        Self::new(&[
            ("file:///app/Models/User.php", USER),
            ("file:///app/Repository.php", REPOSITORY),
        ])
    }

    /// Type of the innermost expression starting at `needle`'s first
    /// character, `occurrence` counting from zero.
    fn type_of(&self, source: &str, needle: &str, occurrence: usize) -> Result<ResolvedType, Error> {
        let document = SyntaxDocument::parse("file:///app/Scratch.php", source, 1)?;
        self.registry.add(document.clone());
        let offset = source
            .match_indices(needle)
            .nth(occurrence)
            .map(|(index, _)| index + 1)
            .ok_or_else(|| Error::DocumentNotFound(needle.to_string()))?;
        Ok(self.resolver.type_at(&document, offset))
    }
}

fn class(name: &str) -> ResolvedType {
    ResolvedType::Class(name.to_string())
}

#[test]
fn this_is_the_enclosing_class_in_every_method() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let document = session.registry.get("file:///app/Models/User.php")?;
    let uses = document.search_nodes(|node| {
        matches!(node, Node::Expr(expr) if expr.as_variable() == Some("this"))
    });
    assert!(uses.len() >= 3);
    for node in uses {
        assert_eq!(session.resolver.resolve(&document, node), class("App\\Models\\User"));
    }
    Ok(())
}

#[test]
fn variable_assigned_an_imported_class() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = "<?php
namespace App\\Http;

use App\\Models\\User;

$u = new User();
echo $u;
";
    assert_eq!(session.type_of(source, "$u;", 0)?, class("App\\Models\\User"));
    Ok(())
}

#[rstest]
#[case::declared("$user->name()", ResolvedType::Scalar(Scalar::String))]
#[case::doc_union("$user->score()", ResolvedType::Union(vec!["int".into(), "float".into()]))]
#[case::fluent_self("$user->touch()", class("App\\Models\\User"))]
#[case::doc_class("$user->profile()", class("App\\Models\\Profile"))]
#[case::nullable_return("$user->manager()", class("App\\Models\\User"))]
#[case::unknown_method("$user->missing()", ResolvedType::Unresolved)]
fn method_return_types(#[case] call: &str, #[case] expected: ResolvedType) -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = format!(
        "<?php
use App\\Models\\User;

function handle(User $user) {{
    return {call};
}}
"
    );
    let call_name = call.trim_start_matches("$user");
    let resolved = session.type_of(&source, call_name, 0)?;
    assert_eq!(resolved, expected);
    Ok(())
}

#[test]
fn return_types_render_as_pipe_joined_text() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = "<?php
use App\\Models\\User;

function handle(User $user) {
    return $user->score();
}
";
    assert_eq!(session.type_of(source, "->score", 0)?.to_string(), "int|float");
    Ok(())
}

#[rstest]
#[case::doc_tag("votes", ResolvedType::Scalar(Scalar::Int))]
#[case::doc_tag_class("team", class("App\\Models\\Team"))]
#[case::declared("email", ResolvedType::Scalar(Scalar::String))]
#[case::last_var_type_wins("owner", class("App\\Models\\Editor"))]
#[case::constructor_assignment("repository", class("App\\Repository"))]
#[case::promoted("createdAt", class("DateTimeImmutable"))]
#[case::unknown("nothing", ResolvedType::Unresolved)]
fn property_types(#[case] property: &str, #[case] expected: ResolvedType) -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = format!(
        "<?php
use App\\Models\\User;

function handle(User $user) {{
    return $user->{property};
}}
"
    );
    assert_eq!(session.type_of(&source, &format!("->{property}"), 0)?, expected);
    Ok(())
}

#[test]
fn chains_through_constructor_assigned_properties() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = "<?php
use App\\Models\\User;

function handle(User $user) {
    return $user->repository->find(1);
}
";
    assert_eq!(session.type_of(source, "->find", 0)?, class("App\\Entity"));
    Ok(())
}

#[test]
fn nearest_preceding_binding_wins() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = "<?php
namespace App;

use App\\Models\\User;
use App\\Models\\Profile;

$a = new User();
echo $a;
$a = new Profile();
echo $a;
";
    assert_eq!(session.type_of(source, "$a;", 0)?, class("App\\Models\\User"));
    assert_eq!(session.type_of(source, "$a;", 1)?, class("App\\Models\\Profile"));
    Ok(())
}

#[test]
fn self_assignment_looks_further_back() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = "<?php
use App\\Models\\User;

$a = new User();
$a = $a;
";
    // The right-hand `$a` of the second assignment.
    assert_eq!(session.type_of(source, "$a;", 0)?, class("App\\Models\\User"));
    Ok(())
}

#[rstest]
#[case::parameter("function f(User $u) { return $u; }", "$u;", class("App\\Models\\User"))]
#[case::nullable_parameter("function f(?User $u) { return $u; }", "$u;", class("App\\Models\\User"))]
#[case::scalar_parameter("function f(int $n) { return $n; }", "$n;", ResolvedType::Scalar(Scalar::Int))]
#[case::union_parameter(
    "function f(int|string $v) { return $v; }",
    "$v;",
    ResolvedType::Union(vec!["int".into(), "string".into()])
)]
#[case::untyped_parameter("function f($v) { return $v; }", "$v;", ResolvedType::Unresolved)]
#[case::unbound("return $nope;", "$nope", ResolvedType::Unresolved)]
#[case::copied("$a = new User(); $b = $a; return $b;", "$b;", class("App\\Models\\User"))]
#[case::static_call("return User::find(1);", "User::find", class("App\\Models\\User"))]
#[case::class_constant("return User::ROLE;", "User::ROLE", class("App\\Models\\User"))]
#[case::static_property("return User::$table;", "User::$table", class("App\\Models\\User"))]
#[case::qualified_import("return new Pkg\\Client();", "new Pkg", class("Vendor\\Pkg\\Client"))]
#[case::fully_qualified("return new \\DateTime();", "new \\", class("DateTime"))]
#[case::literal("return 42;", "42", ResolvedType::Unresolved)]
fn expression_kinds(
    #[case] body: &str,
    #[case] needle: &str,
    #[case] expected: ResolvedType,
) -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = format!(
        "<?php
namespace App\\Http;

use App\\Models\\User;
use Vendor\\Pkg;

{body}
"
    );
    assert_eq!(session.type_of(&source, needle, 0)?, expected);
    Ok(())
}

#[test]
fn self_and_static_inside_a_class() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = "<?php
namespace App\\Models;

class Admin extends User
{
    public function make()
    {
        $a = new self();
        $b = new static();
        $c = new parent();
        return [$a, $b, $c];
    }
}
";
    assert_eq!(session.type_of(source, "$a,", 0)?, class("App\\Models\\Admin"));
    assert_eq!(session.type_of(source, "$b,", 0)?, class("App\\Models\\Admin"));
    assert_eq!(session.type_of(source, "$c]", 0)?, class("App\\Models\\User"));
    Ok(())
}

#[test]
fn inherited_methods_resolve_through_the_parent() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = "<?php
namespace App\\Models;

class Admin extends User
{
    public function boss()
    {
        return $this->touch()->profile();
    }
}
";
    assert_eq!(session.type_of(source, "->profile", 0)?, class("App\\Models\\Profile"));
    // `static` binds to the receiver.
    assert_eq!(session.type_of(source, "->touch", 0)?, class("App\\Models\\Admin"));
    Ok(())
}

#[test]
fn cyclic_constructor_assignments_terminate() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = "<?php
class Loop
{
    public function __construct()
    {
        $this->a = $this->b;
        $this->b = $this->a;
    }
}

$loop = new Loop();
echo $loop->a;
";
    assert_eq!(session.type_of(source, "->a;", 1)?, ResolvedType::Unresolved);
    Ok(())
}

#[test]
fn unsaved_documents_are_seen_through_the_registry() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let source = "<?php
use App\\Models\\User;

function handle(User $user) {
    return $user->nickname();
}
";
    assert_eq!(session.type_of(source, "->nickname", 0)?, ResolvedType::Unresolved);

    let edited = USER.replace(
        "    public function name(): string",
        "    public function nickname(): string {}\n\n    public function name(): string",
    );
    session
        .registry
        .add(SyntaxDocument::parse("file:///app/Models/User.php", &edited, 2)?);
    assert_eq!(session.type_of(source, "->nickname", 0)?, ResolvedType::Scalar(Scalar::String));
    Ok(())
}

#[test]
fn reparsed_buffers_with_the_same_version_resolve_afresh() -> Result<(), Error> {
    let session = Session::new(&[])?;
    let first = "<?php\nclass Alpha {}\n$u = new Alpha();\necho $u;\n";
    let second = "<?php\nclass Betaa {}\n$u = new Betaa();\necho $u;\n";
    for (source, expected) in [(first, "Alpha"), (second, "Betaa"), (first, "Alpha")] {
        let document = SyntaxDocument::parse("file:///app/Buffer.php", source, 1)?;
        let offset = source.find("$u;").map_or(0, |index| index + 1);
        assert_eq!(session.resolver.type_at(&document, offset), class(expected));
    }
    Ok(())
}

#[test]
fn document_identity_follows_the_parse() -> Result<(), Error> {
    let session = Session::with_fixtures()?;
    let document = session.registry.get("file:///app/Models/User.php")?;
    let copy = document.clone();
    assert_eq!(document.id(), copy.id());

    let reparsed = SyntaxDocument::parse(document.uri(), document.source(), document.version())?;
    assert_ne!(document.id(), reparsed.id());
    Ok(())
}
