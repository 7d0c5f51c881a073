mod random_dags;
