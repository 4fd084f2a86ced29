use yieldgen::{Generator, Gn};

fn range(max: u32) -> Generator<u32> {
    Gn::new_scoped(move |mut s| {
        for i in 0..max {
            s.yield_with(i);
        }
    })
}

fn main() {
    // leaving the loop early drops the generator, which stops the producer
    for (expect, i) in range(10).enumerate() {
        if i >= 5 {
            break;
        }
        assert_eq!(expect as u32, i);
        println!("{i}");
    }
}
