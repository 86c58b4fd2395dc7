use ontosync::vocab;
use ontosync::{AnnotationTarget, Literal, Node, PropertyOptions, Statement, World};

fn texts(values: &[Node]) -> Vec<&str> {
    values.iter().filter_map(Node::as_str).collect()
}

struct Fixture {
    world: World,
    onto: ontosync::Ontology,
    obj: ontosync::Entity,
    comment: ontosync::Entity,
}

fn fixture(iri: &str) -> Fixture {
    let mut world = World::new();
    let onto = world.ontology(iri).unwrap();
    let obj = world.declare_class(&onto, "Obj", &[]).unwrap();
    let comment = world.resolve_str(vocab::RDFS_COMMENT).unwrap();
    Fixture {
        world,
        onto,
        obj,
        comment,
    }
}

#[test]
fn plain_value_is_read_through_short_name() {
    let Fixture {
        mut world,
        obj,
        comment,
        ..
    } = fixture("http://test.org/onto_annotation1.owl");
    let target = AnnotationTarget::entity(&obj);

    world
        .set_annotation(&target, &comment, None, vec![Node::from("Test")])
        .unwrap();
    let values = world.annotations_by_name(&target, "comment", None).unwrap();
    assert_eq!(texts(&values), vec!["Test"]);
    assert_eq!(world.annotation_count(&target), 1);
}

#[test]
fn language_slices_are_replaced_independently() {
    let Fixture {
        mut world,
        obj,
        comment,
        ..
    } = fixture("http://test.org/onto_annotation2.owl");
    let target = AnnotationTarget::entity(&obj);

    world
        .set_annotation(&target, &comment, Some("fr"), vec![Node::from("Med")])
        .unwrap();
    world
        .set_annotation(&target, &comment, Some("fr"), vec![Node::from("Médicament")])
        .unwrap();
    world
        .set_annotation(&target, &comment, Some("en"), vec![Node::from("Drug")])
        .unwrap();

    assert_eq!(world.annotation_count(&target), 2);
    let fr = world.annotations_by_name(&target, "comment", Some("fr")).unwrap();
    let en = world.annotations_by_name(&target, "comment", Some("en")).unwrap();
    assert_eq!(texts(&fr), vec!["Médicament"]);
    assert_eq!(texts(&en), vec!["Drug"]);
    assert_eq!(fr[0], Node::from(Literal::tagged("Médicament", "fr").unwrap()));

    // A value tagged with another language does not belong to the slice.
    let err = world
        .set_annotation(
            &target,
            &comment,
            Some("fr"),
            vec![Node::from(Literal::tagged("Drug", "en").unwrap())],
        )
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(world.annotation_count(&target), 2);
}

#[test]
fn count_tracks_keys_not_values() {
    let Fixture {
        mut world,
        obj,
        comment,
        ..
    } = fixture("http://test.org/onto_annotation3.owl");
    let target = AnnotationTarget::entity(&obj);
    let fr = |text: &str| Node::from(Literal::tagged(text, "fr").unwrap());

    world.add_annotation(&target, &comment, fr("Med")).unwrap();
    world.add_annotation(&target, &comment, fr("Médicament")).unwrap();
    world
        .add_annotation(&target, &comment, Literal::tagged("Drug", "en").unwrap())
        .unwrap();
    assert_eq!(world.annotation_count(&target), 2);
    assert_eq!(
        texts(&world.annotations(&target, &comment, Some("fr")).unwrap()),
        vec!["Med", "Médicament"]
    );
    assert_eq!(
        texts(&world.annotations(&target, &comment, Some("en")).unwrap()),
        vec!["Drug"]
    );
    assert_eq!(world.annotations(&target, &comment, None).unwrap().len(), 3);

    assert!(world.remove_annotation(&target, &comment, fr("Med")).unwrap());
    assert!(!world.remove_annotation(&target, &comment, fr("Med")).unwrap());
    assert_eq!(world.annotation_count(&target), 2);
    assert_eq!(
        texts(&world.annotations(&target, &comment, Some("fr")).unwrap()),
        vec!["Médicament"]
    );

    world.insert_annotation(&target, &comment, 0, fr("Med")).unwrap();
    assert_eq!(
        texts(&world.annotations(&target, &comment, Some("fr")).unwrap()),
        vec!["Med", "Médicament"]
    );
    assert_eq!(world.delete_annotation(&target, &comment, Some("fr")).unwrap(), 2);
    assert_eq!(world.annotation_count(&target), 1);
    assert_eq!(
        texts(&world.annotations_by_name(&target, "comment", Some("en")).unwrap()),
        vec!["Drug"]
    );
}

#[test]
fn statement_targets_are_separate_from_entities() {
    let Fixture {
        mut world,
        onto,
        obj,
        comment,
    } = fixture("http://test.org/onto_annotation4.owl");
    let prop = world
        .declare_object_property(&onto, "prop", PropertyOptions::new().functional())
        .unwrap();
    let o1 = world.create_individual(&onto, None, &[&obj]).unwrap();
    let o2 = world.create_individual(&onto, None, &[&obj]).unwrap();
    world.attr(&o1, "prop").unwrap().set(&o2).unwrap();

    let target = AnnotationTarget::statement(&o1, &prop, &o2);
    world
        .set_annotation(&target, &comment, None, vec![Node::from("Test")])
        .unwrap();
    assert_eq!(
        texts(&world.annotations_by_name(&target, "comment", None).unwrap()),
        vec!["Test"]
    );
    assert_eq!(world.annotation_count(&AnnotationTarget::entity(&o1)), 0);

    // Targets must be rooted at known entities.
    let stranger = AnnotationTarget::Entity {
        iri: onto.entity_iri("ghost").unwrap(),
    };
    assert!(world.add_annotation(&stranger, &comment, "x").is_err());
    // Only annotation properties carry annotations.
    assert!(world.annotations(&target, &prop, None).unwrap_err().is_validation());
}

#[test]
fn short_name_aggregates_sub_properties() {
    let Fixture {
        mut world,
        onto,
        obj,
        comment,
    } = fixture("http://test.org/onto_annotation5.owl");
    world
        .declare_annotation_property(&onto, "comment2", Some(&comment))
        .unwrap();
    let target = AnnotationTarget::entity(&obj);

    world
        .set_annotations_by_name(&target, "comment", vec![Node::from("1")])
        .unwrap();
    world
        .set_annotations_by_name(&target, "comment2", vec![Node::from("2")])
        .unwrap();
    assert_eq!(
        texts(&world.annotations_by_name(&target, "comment", None).unwrap()),
        vec!["1", "2"]
    );
    assert_eq!(
        texts(&world.annotations_by_name(&target, "comment2", None).unwrap()),
        vec!["2"]
    );
    assert_eq!(world.annotation_count(&target), 2);

    assert_eq!(world.delete_annotations_by_name(&target, "comment").unwrap(), 2);
    assert_eq!(world.annotation_count(&target), 0);

    assert!(world
        .set_annotations_by_name(&target, "no_such_property", vec![Node::from("x")])
        .unwrap_err()
        .is_not_found());
}

#[test]
fn empty_alias_is_rejected() {
    let Fixture { mut world, obj, .. } = fixture("http://test.org/onto_alias_empty.owl");
    assert!(world.set_alias(&obj, "").unwrap_err().is_validation());
    assert_eq!(world.alias_of(&obj), None);

    world.set_alias(&obj, "Thingy").unwrap();
    assert_eq!(world.alias_of(&obj).as_deref(), Some("Thingy"));
    assert_eq!(world.find_by_name("Thingy"), vec![obj.clone()]);
}

#[test]
fn annotations_are_statements_in_the_store() {
    let Fixture {
        mut world,
        onto,
        obj,
        comment,
    } = fixture("http://test.org/onto_annotation6.owl");
    let before = world.statement_count();
    let target = AnnotationTarget::entity(&obj);

    world.add_annotation(&target, &comment, "note").unwrap();
    world.add_annotation(&target, &comment, "note").unwrap();
    assert_eq!(world.statement_count(), before + 1);
    let stored = world.statements(Some(&obj.node()), Some(comment.iri()), None);
    assert_eq!(stored, vec![Statement::new(&obj, comment.iri().clone(), "note")]);
    assert!(world.statements_of(&onto).contains(&stored[0]));

    // A raw statement with an annotation property reads back as an annotation.
    world
        .add_statement(&onto, Statement::new(&obj, comment.iri().clone(), "raw"))
        .unwrap();
    assert_eq!(
        texts(&world.annotations(&target, &comment, None).unwrap()),
        vec!["note", "raw"]
    );
    assert_eq!(world.delete_annotation(&target, &comment, None).unwrap(), 2);
    assert_eq!(world.statement_count(), before);
}

#[test]
fn statement_annotations_need_an_asserted_statement() {
    let Fixture {
        mut world,
        onto,
        obj,
        comment,
    } = fixture("http://test.org/onto_annotation7.owl");
    let prop = world
        .declare_object_property(&onto, "prop", PropertyOptions::new())
        .unwrap();
    let o1 = world.create_individual(&onto, None, &[&obj]).unwrap();
    let o2 = world.create_individual(&onto, None, &[&obj]).unwrap();
    let target = AnnotationTarget::statement(&o1, &prop, &o2);

    let err = world.add_annotation(&target, &comment, "x").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(world.annotation_count(&target), 0);

    world.attr(&o1, "prop").unwrap().append(&o2).unwrap();
    let before = world.statement_count();
    world.add_annotation(&target, &comment, "x").unwrap();
    world.add_annotation(&target, &comment, "y").unwrap();
    // The axiom node (four statements) plus the two values.
    assert_eq!(world.statement_count(), before + 6);
    let owl_axiom = ontosync::vocab::iri(ontosync::vocab::OWL_AXIOM);
    assert_eq!(
        world
            .statements(None, None, Some(&Node::from(owl_axiom)))
            .len(),
        1
    );

    // Dropping the last value drops the axiom node too.
    assert!(world.remove_annotation(&target, &comment, "x").unwrap());
    assert_eq!(world.statement_count(), before + 5);
    assert!(world.remove_annotation(&target, &comment, "y").unwrap());
    assert_eq!(world.statement_count(), before);
}

#[test]
fn removing_a_value_drops_the_annotations_on_it() {
    let Fixture {
        mut world,
        onto,
        obj,
        comment,
    } = fixture("http://test.org/onto_annotation8.owl");
    let prop = world
        .declare_object_property(&onto, "prop", PropertyOptions::new())
        .unwrap();
    let o1 = world.create_individual(&onto, None, &[&obj]).unwrap();
    let o2 = world.create_individual(&onto, None, &[&obj]).unwrap();
    world.attr(&o1, "prop").unwrap().append(&o2).unwrap();
    let before = world.statement_count();

    let target = AnnotationTarget::statement(&o1, &prop, &o2);
    world
        .set_annotation(&target, &comment, Some("en"), vec![Node::from("because")])
        .unwrap();
    assert_eq!(world.annotation_count(&target), 1);

    world.attr(&o1, "prop").unwrap().remove(&o2).unwrap();
    assert_eq!(world.statement_count(), before - 1);
    assert_eq!(world.annotation_count(&target), 0);

    // Re-asserting the statement does not bring the old annotation back.
    world.attr(&o1, "prop").unwrap().append(&o2).unwrap();
    assert_eq!(world.annotation_count(&target), 0);
    assert_eq!(world.statement_count(), before);
}
