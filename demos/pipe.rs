use yieldgen::{Generator, Gn};

fn main() {
    // each stage takes its input generator on the first run only, so a
    // reset or clone of `square` and `sum` replays an empty sequence
    fn square(input: Generator<u32>) -> Generator<u32> {
        let input = std::sync::Mutex::new(Some(input));
        Gn::new_scoped(move |mut s| {
            let input = input.lock().ok().and_then(|mut i| i.take());
            for i in input.into_iter().flatten() {
                s.yield_with(i * i);
            }
        })
    }

    fn sum(input: Generator<u32>) -> Generator<u32> {
        let input = std::sync::Mutex::new(Some(input));
        Gn::new_scoped(move |mut s| {
            let input = input.lock().ok().and_then(|mut i| i.take());
            let mut acc = 0;
            for i in input.into_iter().flatten() {
                acc += i;
                s.yield_with(acc);
            }
        })
    }

    let range = Gn::new_scoped(|mut s| {
        for i in 0..10 {
            s.yield_with(i);
        }
    });

    for i in sum(square(range)) {
        println!("i = {i:?}");
    }
}
