use neuro::{MiniBatchGradientDescent, Network, NetworkConfig};
use rand::{prelude::*, thread_rng};

fn gen_training_data() -> (Vec<f64>, Vec<f64>) {
    let mut rng = thread_rng();

    let classes: Vec<(Vec<f64>, Vec<f64>)> = vec![
        (vec![1., 1., 0.], vec![1., 0.]),
        (vec![0., 1., 1.], vec![0., 1.]),
        (vec![1., 0., 1.], vec![0., 1.]),
    ];

    let data = classes.choose(&mut rng).unwrap();
    (data.0.clone(), data.1.clone())
}

fn main() {
    let (mut x, mut y) = (vec![], vec![]);
    for _ in 0..300 {
        let (_x, _y) = gen_training_data();
        x.push(_x);
        y.push(_y);
    }

    let mut config = NetworkConfig::new(vec![3, 10, 5, 2], vec!["tanh", "sigmoid", "softmax"], 10);
    config.set_trainable(true);
    let mut nn = Network::new(&config).unwrap();

    let data = (x, y);
    let mut mbgd = MiniBatchGradientDescent::new(&mut nn);
    mbgd.set_learning_rate(0.1)
        .set_momentum(0.5)
        .set_decay(0.999)
        .set_epochs(200)
        .set_shuffle(true)
        .set_patience(10)
        .set_min_delta(1e-6)
        .until()
        .train(&data)
        .unwrap();

    println!("Epochs: {}", mbgd.losses.len());
    println!("Final loss: {:?}", mbgd.losses.last());
    println!("Accuracy: {}%", mbgd.accuracy(&data).unwrap() * 100.);

    drop(mbgd);
    println!("{}", nn.export_state().dump().unwrap());
}
