use ontosync::vocab;
use ontosync::{
    AnnotationTarget, ClassExpr, Entity, Literal, Node, Ontology, OntologyDocument,
    PropertyOptions, World, WorldConfig,
};

const IRI: &str = "http://test.org/test_annotations.owl";

fn texts(values: &[Node]) -> Vec<&str> {
    values.iter().filter_map(Node::as_str).collect()
}

fn world_in(dir: &std::path::Path) -> World {
    World::with_config(WorldConfig {
        search_paths: vec![dir.to_path_buf()],
        ..WorldConfig::default()
    })
    .unwrap()
}

fn named(world: &World, onto: &Ontology, name: &str) -> Entity {
    world
        .entity(onto, name)
        .unwrap_or_else(|| panic!("{name} is not declared"))
}

/// C, D < C, rel (domain D, range C), i: D with `i rel j`, and comments on
/// entities and axioms.
fn build(world: &mut World) -> Ontology {
    let onto = world.ontology(IRI).unwrap();
    let comment = world.resolve_str(vocab::RDFS_COMMENT).unwrap();
    let c = world.declare_class(&onto, "C", &[]).unwrap();
    let d = world.declare_class(&onto, "D", &[ClassExpr::from(&c)]).unwrap();
    let rel = world
        .declare_object_property(&onto, "rel", PropertyOptions::new().domain(&d).range(&c))
        .unwrap();
    let i = world.create_individual(&onto, Some("i"), &[&d]).unwrap();
    let j = world.create_individual(&onto, Some("j"), &[&c]).unwrap();
    world.property(&i, &rel).unwrap().append(&j).unwrap();

    let c_target = AnnotationTarget::entity(&c);
    world
        .set_annotation(&c_target, &comment, Some("fr"), vec![Node::from("Teste !")])
        .unwrap();
    world
        .set_annotation(&c_target, &comment, Some("en"), vec![Node::from("test")])
        .unwrap();
    let annotate = |world: &mut World, target: AnnotationTarget, values: &[&str]| {
        for value in values {
            world.add_annotation(&target, &comment, *value).unwrap();
        }
    };
    annotate(world, AnnotationTarget::axiom(&d, vocab::RDFS_SUBCLASS_OF, &c), &["annot"]);
    annotate(world, AnnotationTarget::axiom(&rel, vocab::RDFS_DOMAIN, &d), &["dom"]);
    annotate(
        world,
        AnnotationTarget::axiom(&rel, vocab::RDFS_RANGE, &c),
        &["range1", "range2"],
    );
    annotate(world, AnnotationTarget::entity(&i), &["ind"]);
    annotate(world, AnnotationTarget::axiom(&i, vocab::RDF_TYPE, &d), &["ind class"]);
    annotate(world, AnnotationTarget::statement(&i, &rel, &j), &["ind rel"]);
    onto
}

fn check(world: &World, onto: &Ontology) {
    let c = named(world, onto, "C");
    let d = named(world, onto, "D");
    let rel = named(world, onto, "rel");
    let i = named(world, onto, "i");
    let j = named(world, onto, "j");
    let read = |target: AnnotationTarget, lang: Option<&str>| {
        world.annotations_by_name(&target, "comment", lang).unwrap()
    };

    assert_eq!(texts(&read(AnnotationTarget::entity(&c), Some("fr"))), vec!["Teste !"]);
    assert_eq!(texts(&read(AnnotationTarget::entity(&c), Some("en"))), vec!["test"]);
    assert_eq!(
        read(AnnotationTarget::entity(&c), Some("fr"))[0],
        Node::from(Literal::tagged("Teste !", "fr").unwrap())
    );
    assert_eq!(
        texts(&read(AnnotationTarget::axiom(&d, vocab::RDFS_SUBCLASS_OF, &c), None)),
        vec!["annot"]
    );
    assert_eq!(
        texts(&read(AnnotationTarget::axiom(&rel, vocab::RDFS_DOMAIN, &d), None)),
        vec!["dom"]
    );
    assert_eq!(
        texts(&read(AnnotationTarget::axiom(&rel, vocab::RDFS_RANGE, &c), None)),
        vec!["range1", "range2"]
    );
    assert_eq!(texts(&read(AnnotationTarget::entity(&i), None)), vec!["ind"]);
    assert_eq!(
        texts(&read(AnnotationTarget::axiom(&i, vocab::RDF_TYPE, &d), None)),
        vec!["ind class"]
    );
    assert_eq!(
        texts(&read(AnnotationTarget::statement(&i, &rel, &j), None)),
        vec!["ind rel"]
    );

    assert!(world.is_subclass_of(&d, &c));
    assert!(world.is_instance_of(&i, &c));
    assert_eq!(world.domain(&rel), vec![d.clone()]);
    assert_eq!(world.range(&rel), vec![c.iri().clone()]);
    assert_eq!(
        world.statements(Some(&i.node()), Some(rel.iri()), None).len(),
        1
    );
}

#[test]
fn saved_ontology_reloads_with_annotations() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = world_in(dir.path());
    let onto = build(&mut world);
    check(&world, &onto);

    let path = world.save(&onto).unwrap();
    assert_eq!(path, dir.path().join("test_annotations.owl.json"));

    let mut reloaded = world_in(dir.path());
    let onto2 = reloaded.load(IRI).unwrap();
    check(&reloaded, &onto2);
    assert_eq!(reloaded.statement_count(), world.statement_count());
    assert!(reloaded.has_attr(&named(&reloaded, &onto2, "i"), "rel"));
}

#[test]
fn destroyed_ontology_can_be_loaded_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = world_in(dir.path());
    let onto = build(&mut world);
    world.save(&onto).unwrap();

    world.destroy_ontology(&onto).unwrap();
    assert!(world.get_ontology(IRI).is_none());
    assert_eq!(world.statement_count(), 0);

    let onto = world.load(IRI).unwrap();
    check(&world, &onto);
}

#[test]
fn fusion_bindings_are_rebuilt_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = world_in(dir.path());
    let onto = world.ontology("http://test.org/onto_fusion_doc.owl").unwrap();
    let c1 = world.declare_class(&onto, "C1", &[]).unwrap();
    let c2 = world.declare_class(&onto, "C2", &[]).unwrap();
    world.create_individual(&onto, Some("o"), &[&c1, &c2]).unwrap();
    let path = dir.path().join("nested").join("fusion.json");
    world.save_to(&onto, &path).unwrap();

    let mut reloaded = World::new();
    let onto = reloaded.load_from(&path).unwrap();
    let o = named(&reloaded, &onto, "o");
    let live = reloaded.type_of(&o).unwrap();
    assert!(live.is_fusion());
    assert_eq!(live.fusion_bases().unwrap().len(), 2);
    assert_eq!(reloaded.fusion_mappings().len(), 1);
}

#[test]
fn missing_and_corrupt_documents_fail() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = world_in(dir.path());
    assert!(world.load("http://test.org/absent.owl").unwrap_err().is_not_found());

    let path = dir.path().join("corrupt.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(world.load_from(&path).is_err());
    assert!(world.ontologies().is_empty());

    let mut doc = World::new();
    let onto = doc.ontology("http://test.org/v.owl").unwrap();
    let mut exported: OntologyDocument = doc.export_document(&onto).unwrap();
    exported.format_version += 1;
    let json = serde_json::to_string(&exported).unwrap();
    assert!(OntologyDocument::from_json(&json).is_err());
}
