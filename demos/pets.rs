/// Pets example — three owners, one grammar, consistent pets.
///
/// Bob has no preference; Alice and Carol carry a `class` tag that the
/// mismatch filter uses to keep their animals in line.
///
/// Run with: cargo run --example pets

use snippet_engine::{filters, Generator, Group, Model, Snippet, Spec, Tag};

fn main() {
    let spec = Spec::new()
        .with_snippet(
            "animal",
            Snippet::new(vec![
                Group::new([Tag::from(["class", "mammal"])], ["dog", "cat"]),
                Group::new([Tag::from(["class", "bird"])], ["parrot"]),
            ]),
        )
        .with_snippet(
            "root",
            Snippet::new(vec![Group::untagged([
                "[name]: I have [a :animal] who is [#2-7] years old.",
            ])]),
        );

    let mut generator = Generator::builder(spec)
        .filter(filters::mismatch())
        .build()
        .expect("Failed to build generator");

    let owners = [
        Model::new().with_field("name", "Bob"),
        Model::new()
            .with_field("name", "Alice")
            .with_tag(["class", "mammal"]),
        Model::new()
            .with_field("name", "Carol")
            .with_tag(["class", "bird"]),
    ];

    for mut owner in owners {
        match generator.gen("root", &mut owner) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("ERROR: {}", e),
        }
    }
}
