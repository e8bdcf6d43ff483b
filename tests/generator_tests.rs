/// Generator integration tests — filtering, selection, directives, and state.

use snippet_engine::core::generator::GenError;
use snippet_engine::filters;
use snippet_engine::{Generator, Group, Model, Snippet, Spec, Tag};

fn pets() -> Spec {
    Spec::new()
        .with_snippet("line", Snippet::new(vec![Group::untagged(["I love my [:pet]."])]))
        .with_snippet(
            "pet",
            Snippet::new(vec![
                Group::new([Tag::from(["animal", "dog"])], ["dog"]),
                Group::new([Tag::from(["animal", "cat"])], ["cat"]),
            ]),
        )
}

/// A random source that replays `draws`, then keeps returning 0.
fn replay(draws: &[f64]) -> impl FnMut() -> f64 {
    let mut draws = draws.to_vec().into_iter();
    move || draws.next().unwrap_or(0.0)
}

#[test]
fn mismatch_filter_follows_model_tags() {
    let mut g = Generator::builder(pets())
        .filter(filters::mismatch())
        .rng(|| 0.0)
        .build()
        .unwrap();

    let mut dog_owner = Model::new().with_tag(["animal", "dog"]);
    let mut cat_owner = Model::new().with_tag(["animal", "cat"]);

    assert_eq!(g.gen("pet", &mut dog_owner).unwrap(), "dog");
    assert_eq!(g.gen("pet", &mut cat_owner).unwrap(), "cat");
    assert_eq!(g.gen("line", &mut cat_owner).unwrap(), "I love my cat.");
}

#[test]
fn unknown_snippet_is_not_generated() {
    let mut g = Generator::builder(pets()).build().unwrap();
    let err = g.gen("unicorn", &mut Model::new()).unwrap_err();
    assert!(matches!(err, GenError::UnknownSnippet(ref name) if name == "unicorn"));
    assert!(g.history().is_empty());
}

#[test]
fn unknown_nested_snippet_is_an_error() {
    let spec = Spec::new().with_snippet("root", Snippet::new(vec![Group::untagged(["[:ghost]"])]));
    let mut g = Generator::builder(spec).build().unwrap();
    assert!(matches!(
        g.gen("root", &mut Model::new()),
        Err(GenError::UnknownSnippet(name)) if name == "ghost"
    ));
}

#[test]
fn numeric_range_uses_the_configured_source() {
    let spec = Spec::new().with_snippet("roll", Snippet::new(vec![Group::untagged(["[#1-20]"])]));
    for (draw, expected) in [(0.0, "1"), (0.5, "10"), (1.0, "20")] {
        let mut g = Generator::builder(spec.clone())
            .rng(move || draw)
            .build()
            .unwrap();
        assert_eq!(g.gen("roll", &mut Model::new()).unwrap(), expected);
    }
}

#[test]
fn numeric_range_past_i64_is_invalid() {
    let spec = Spec::new().with_snippet(
        "roll",
        Snippet::new(vec![Group::untagged(["[#1-9223372036854775807]"])]),
    );
    let mut g = Generator::builder(spec).rng(|| 1.0).build().unwrap();
    match g.gen("roll", &mut Model::new()) {
        Err(GenError::InvalidDirective(d)) => assert_eq!(d, "#1-9223372036854775807"),
        other => panic!("expected invalid directive, got {:?}", other),
    }
}

#[test]
fn templates_mix_fields_ranges_and_snippets() {
    let spec = Spec::new()
        .with_snippet(
            "root",
            Snippet::new(vec![Group::untagged([
                "Hi, my name is [name], and I own [#1-20] [:pet]s.",
            ])]),
        )
        .with_snippet(
            "pet",
            Snippet::new(vec![Group::untagged(["cat", "dog", "parakeet"])]),
        );
    let mut g = Generator::builder(spec).seed(7).build().unwrap();
    let mut model = Model::new().with_field("name", "Bob");

    for _ in 0..20 {
        let line = g.gen("root", &mut model).unwrap();
        let rest = line
            .strip_prefix("Hi, my name is Bob, and I own ")
            .unwrap_or_else(|| panic!("unexpected line: {}", line));
        let (count, pet) = rest.split_once(' ').unwrap();
        let count: i64 = count.parse().unwrap();
        assert!((1..20).contains(&count), "count out of range: {}", count);
        assert!(["cats.", "dogs.", "parakeets."].contains(&pet), "unexpected pet: {}", pet);
    }
}

#[test]
fn dryness_never_repeats_until_exhausted() {
    let spec = Spec::new().with_snippet(
        "animal",
        Snippet::new(vec![Group::untagged(["dog", "cat", "pig"])]),
    );
    let mut g = Generator::builder(spec)
        .filter(filters::dryness())
        .rng(|| 0.0)
        .build()
        .unwrap();
    let mut model = Model::new();

    let picks: Vec<String> = (0..3).map(|_| g.gen("animal", &mut model).unwrap()).collect();
    assert_eq!(picks, vec!["dog", "cat", "pig"]);

    match g.gen("animal", &mut model) {
        Err(GenError::ExhaustedCandidates { snippet, candidates }) => {
            assert_eq!(snippet, "animal");
            assert_eq!(candidates.len(), 1);
            assert!(candidates[0].group.phrases.is_empty());
        }
        other => panic!("expected exhausted candidates, got {:?}", other),
    }

    g.clear_history();
    assert_eq!(g.gen("animal", &mut model).unwrap(), "dog");
}

#[test]
fn history_survives_nested_generation_without_persistence() {
    let spec = Spec::new()
        .with_snippet("root", Snippet::new(vec![Group::untagged(["[:pet], [:pet]"])]))
        .with_snippet("pet", Snippet::new(vec![Group::untagged(["dog", "cat"])]));
    let mut g = Generator::builder(spec)
        .filter(filters::dryness())
        .persistence(false)
        .rng(|| 0.0)
        .build()
        .unwrap();

    assert_eq!(g.gen("root", &mut Model::new()).unwrap(), "dog, cat");
    assert!(g.history().is_empty());
    assert_eq!(g.gen("root", &mut Model::new()).unwrap(), "dog, cat");
}

#[test]
fn reincorporation_adds_used_tags() {
    let spec = Spec::new()
        .with_snippet("root", Snippet::new(vec![Group::new([Tag::from(["test"])], ["test"])]))
        .with_snippet(
            "tagged",
            Snippet::new(vec![Group::new(
                [Tag::from(["foo", "bar"]), Tag::from(["baz"])],
                ["test"],
            )]),
        );
    let mut g = Generator::builder(spec).reincorporate(true).build().unwrap();

    let mut model = Model::new();
    g.gen("root", &mut model).unwrap();
    assert_eq!(model.tags, vec![Tag::from(["test"])]);

    let mut model = Model::new().with_tag(["foo"]);
    g.gen("tagged", &mut model).unwrap();
    assert_eq!(model.tags, vec![Tag::from(["foo", "bar"]), Tag::from(["baz"])]);
}

fn pet_and_food() -> Spec {
    Spec::new()
        .with_snippet("root", Snippet::new(vec![Group::untagged(["[:pet] likes [:food]"])]))
        .with_snippet("scoped", Snippet::new(vec![Group::untagged(["[|animal|dog:food]"])]))
        .with_snippet(
            "pet",
            Snippet::new(vec![
                Group::new([Tag::from(["animal", "dog"])], ["dog"]),
                Group::new([Tag::from(["animal", "cat"])], ["cat"]),
            ]),
        )
        .with_snippet(
            "food",
            Snippet::new(vec![
                Group::new([Tag::from(["animal", "cat"])], ["fish"]),
                Group::new([Tag::from(["animal", "dog"])], ["bones"]),
            ]),
        )
}

#[test]
fn reincorporation_steers_later_choices() {
    let build = |reincorporate: bool| {
        Generator::builder(pet_and_food())
            .filter(filters::mismatch())
            .reincorporate(reincorporate)
            .rng(|| 0.9)
            .build()
            .unwrap()
    };

    let mut model = Model::new();
    assert_eq!(build(false).gen("root", &mut model).unwrap(), "cat likes bones");
    assert!(model.tags.is_empty());

    let mut model = Model::new();
    let mut g = build(true);
    assert_eq!(g.gen("root", &mut model).unwrap(), "cat likes fish");
    assert_eq!(model.tags, vec![Tag::from(["animal", "cat"])]);
    assert_eq!(
        g.tag_history().iter().cloned().collect::<Vec<_>>(),
        vec![Tag::from(["animal", "cat"]), Tag::from(["animal", "cat"])]
    );
}

#[test]
fn scoped_generation_leaves_caller_model_alone() {
    let mut g = Generator::builder(pet_and_food())
        .filter(filters::mismatch())
        .reincorporate(true)
        .rng(|| 0.0)
        .build()
        .unwrap();
    let mut model = Model::new().with_tag(["animal", "cat"]);

    assert_eq!(g.gen("scoped", &mut model).unwrap(), "bones");
    assert_eq!(model.tags, vec![Tag::from(["animal", "cat"])]);
    // `food` is unbound, so nothing is carried back.
    assert!(model.bindings.is_empty());
}

#[test]
fn bound_snippets_repeat_within_a_model() {
    let spec = Spec::new()
        .with_snippet(
            "root",
            Snippet::new(vec![Group::untagged(["[:name] met [:name]."])]),
        )
        .with_snippet(
            "name",
            Snippet::bound(vec![Group::untagged(["Alice", "Bob", "Carol"])]),
        );
    let mut g = Generator::builder(spec)
        .rng(replay(&[0.0, 0.5, 0.0, 0.0]))
        .build()
        .unwrap();

    let mut first = Model::new();
    assert_eq!(g.gen("root", &mut first).unwrap(), "Bob met Bob.");
    assert_eq!(first.binding("name"), Some("Bob"));

    let mut second = Model::new();
    assert_eq!(g.gen("root", &mut second).unwrap(), "Alice met Alice.");
    assert_eq!(first.binding("name"), Some("Bob"));
}

#[test]
fn scoped_generation_shares_bindings() {
    let spec = Spec::new()
        .with_snippet("root", Snippet::new(vec![Group::untagged(["[|animal|dog:intro] / [:name]"])]))
        .with_snippet("intro", Snippet::new(vec![Group::untagged(["owner [:name]"])]))
        .with_snippet("name", Snippet::bound(vec![Group::untagged(["Alice", "Bob"])]));
    let mut g = Generator::builder(spec)
        .rng(replay(&[0.0, 0.0, 0.0, 0.9]))
        .build()
        .unwrap();

    let mut model = Model::new();
    assert_eq!(g.gen("root", &mut model).unwrap(), "owner Alice / Alice");
    assert_eq!(model.binding("name"), Some("Alice"));
    assert!(model.tags.is_empty());
}

#[test]
fn unmentioned_prefers_fresh_categories() {
    let spec = Spec::new()
        .with_snippet("root", Snippet::new(vec![Group::untagged(["[:intro]; [:detail]"])]))
        .with_snippet(
            "intro",
            Snippet::new(vec![Group::new([Tag::from(["color", "red"])], ["The red one"])]),
        )
        .with_snippet(
            "detail",
            Snippet::new(vec![
                Group::new([Tag::from(["color", "red"])], ["red paint"]),
                Group::new([Tag::from(["size", "big"])], ["big wheels"]),
            ]),
        );
    let mut g = Generator::builder(spec)
        .filter(filters::unmentioned(1.0))
        .rng(|| 0.0)
        .build()
        .unwrap();

    assert_eq!(g.gen("root", &mut Model::new()).unwrap(), "The red one; big wheels");
    assert_eq!(g.tag_history().front(), Some(&Tag::from(["size", "big"])));
}

#[test]
fn bonus_filters_favor_specific_matches() {
    let spec = Spec::new().with_snippet(
        "ruler",
        Snippet::new(vec![
            Group::untagged(["a ruler"]),
            Group::new([Tag::from(["government", "autocracy"])], ["an autocrat"]),
            Group::new(
                [Tag::from(["government", "autocracy", "monarchy"])],
                ["a monarch"],
            ),
        ]),
    );
    let mut g = Generator::builder(spec)
        .filter(filters::mismatch())
        .filter(filters::partial_bonus(1.0, false))
        .filter(filters::full_bonus(2.0, false))
        .rng(|| 0.0)
        .build()
        .unwrap();
    let mut model = Model::new().with_tag(["government", "autocracy", "monarchy"]);

    assert_eq!(g.gen("ruler", &mut model).unwrap(), "a monarch");
}

#[test]
fn audit_counts_every_choice() {
    let spec = pets();
    let mut g = Generator::builder(spec).audit(true).seed(3).build().unwrap();
    let mut model = Model::new();
    for _ in 0..50 {
        g.gen("line", &mut model).unwrap();
    }

    let audit = g.audit().unwrap();
    assert_eq!(audit.count("line", "I love my [:pet]."), Some(50));
    let pets = audit.count("pet", "dog").unwrap() + audit.count("pet", "cat").unwrap();
    assert_eq!(pets, 50);

    g.reset_audit();
    assert_eq!(g.audit().unwrap().count("line", "I love my [:pet]."), Some(0));
}

#[test]
fn audit_is_absent_by_default() {
    let g = Generator::builder(pets()).build().unwrap();
    assert!(g.audit().is_none());
}

#[test]
fn malformed_phrase_surfaces_from_gen() {
    let spec = Spec::new().with_snippet("bad", Snippet::new(vec![Group::untagged(["oops [name"])]));
    let mut g = Generator::builder(spec).build().unwrap();
    assert!(matches!(
        g.gen("bad", &mut Model::new()),
        Err(GenError::MalformedDirective(phrase)) if phrase == "oops [name"
    ));
}

#[test]
fn model_functions_and_generator_builtins() {
    let spec = Spec::new().with_snippet(
        "greeting",
        Snippet::new(vec![Group::untagged(["[A :pet] named [shout name] [wave 'hi']"])]),
    );
    let spec = spec.with_snippet("pet", Snippet::new(vec![Group::untagged(["owl"])]));
    let mut g = Generator::builder(spec)
        .builtin("wave", |t| format!("{} o/", t))
        .build()
        .unwrap();
    let mut model = Model::new()
        .with_field("name", "Rex")
        .with_function("shout", |t| t.to_uppercase());

    assert_eq!(g.gen("greeting", &mut model).unwrap(), "An owl named REX hi o/");
}
