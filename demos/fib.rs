use yieldgen::{yield_with, Generator, Gn};

fn fib() -> Generator<u32> {
    Gn::new(|| {
        let (mut a, mut b) = (0u32, 1u32);
        while b < 200 {
            std::mem::swap(&mut a, &mut b);
            b += a;
            yield_with(b);
        }
    })
}

fn main() {
    let g = fib();
    let g1 = g.clone();

    for i in g {
        println!("{i}");
    }

    // the clone starts from the beginning
    println!("sum = {}", g1.sum::<u32>());
}
